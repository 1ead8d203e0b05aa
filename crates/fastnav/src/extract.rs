//! Fragment extraction from full HTML documents.
//!
//! Locates the main-content container and the document title using the
//! `scraper` crate. Works equally on full documents and on bare fragments
//! (the parser wraps the latter in an implicit `<body>`).

use scraper::{Html, Selector};

use crate::error::{NavError, NavResult};

/// Main content and title pulled out of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub fragment: String,
    pub title: String,
}

/// Extracts fragments with a fixed container selector.
///
/// Holds the selector source rather than the compiled form so the extractor
/// can be shared across tasks; the selector is validated on construction.
#[derive(Debug, Clone)]
pub struct FragmentExtractor {
    selector: String,
}

impl FragmentExtractor {
    pub fn new(selector: &str) -> NavResult<Self> {
        parse_selector(selector)?;
        Ok(Self {
            selector: selector.to_string(),
        })
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Extract `(fragment, title)` from raw HTML.
    pub fn extract(&self, html: &str) -> ExtractedPage {
        // Validated in `new`; a failed parse degrades to the body fallback.
        let sel = parse_selector(&self.selector).ok();
        extract_with(html, sel.as_ref())
    }
}

/// Extract `(fragment, title)` from raw HTML using `selector` for the
/// main-content container.
///
/// If the container is missing or empty, the whole `<body>` content is used.
pub fn extract_fragment(html: &str, selector: &str) -> NavResult<ExtractedPage> {
    let sel = parse_selector(selector)?;
    Ok(extract_with(html, Some(&sel)))
}

/// Parse a CSS selector, mapping the error into [`NavError::Selector`].
pub fn parse_selector(selector: &str) -> NavResult<Selector> {
    Selector::parse(selector).map_err(|e| NavError::Selector(format!("{selector}: {e:?}")))
}

fn extract_with(html: &str, container: Option<&Selector>) -> ExtractedPage {
    let document = Html::parse_document(html);

    let fragment = container
        .and_then(|sel| document.select(sel).next())
        .map(|el| el.inner_html())
        .filter(|inner| !inner.is_empty())
        .or_else(|| body_html(&document))
        .unwrap_or_default();

    ExtractedPage {
        fragment,
        title: document_title(&document),
    }
}

fn body_html(document: &Html) -> Option<String> {
    let sel = Selector::parse("body").ok()?;
    document.select(&sel).next().map(|el| el.inner_html())
}

/// Text of the first `<title>`, with whitespace collapsed the way browsers
/// report `document.title`.
fn document_title(document: &Html) -> String {
    let Ok(sel) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| {
            let text: String = el.text().collect();
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .unwrap_or_default()
}
