//! The document capability seam.
//!
//! [`Document`] is everything the engine needs from a live page; a browser
//! binding implements it over the DOM. [`DocumentEventSource`] delivers user
//! interactions. [`HeadlessDocument`] is an in-memory implementation used by
//! the CLI and the tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use scraper::Html;
use tokio::sync::mpsc;
use url::Url;

use crate::config::EngineConfig;
use crate::error::NavResult;
use crate::extract::{extract_fragment, parse_selector};
use crate::types::{DocumentEvent, LinkCandidate};

/// Operations the engine performs on the live page.
pub trait Document: Send {
    /// Current location (already updated on back/forward).
    fn location(&self) -> Url;
    fn title(&self) -> String;
    fn set_title(&mut self, title: &str);
    /// Markup currently inside the main-content container.
    fn main_content(&self) -> String;
    /// Markup inside `<body>`, chrome included.
    fn body_content(&self) -> String;
    /// Replace the main-content container's markup. `false` if the page
    /// has no such container.
    fn replace_main_content(&mut self, html: &str) -> bool;
    /// Push `url` onto session history and make it the location.
    fn push_history(&mut self, url: &Url);
    /// Full browser-native navigation.
    fn assign_location(&mut self, url: &Url);
    /// Raw `href` attributes of the navigation links, in document order.
    fn nav_links(&self) -> Vec<String>;
    fn set_nav_link_active(&mut self, index: usize, active: bool);
    /// Links worth prefetching as soon as they are visible.
    fn prefetchable_links(&self) -> Vec<LinkCandidate>;
    fn scroll_to_top(&mut self);
    fn set_root_attribute(&mut self, name: &str, value: &str);
}

/// Document handle shared between the engine and its adapter.
pub type SharedDocument = Arc<Mutex<dyn Document>>;

/// Lock a shared document. Never held across an await point.
pub fn lock_document(document: &SharedDocument) -> MutexGuard<'_, dyn Document + 'static> {
    document.lock().unwrap_or_else(|e| e.into_inner())
}

/// Delivers document interactions to the engine.
#[async_trait]
pub trait DocumentEventSource: Send {
    /// Next interaction, or `None` when the page is gone.
    async fn next_event(&mut self) -> Option<DocumentEvent>;
}

#[async_trait]
impl DocumentEventSource for mpsc::Receiver<DocumentEvent> {
    async fn next_event(&mut self) -> Option<DocumentEvent> {
        self.recv().await
    }
}

#[async_trait]
impl DocumentEventSource for mpsc::UnboundedReceiver<DocumentEvent> {
    async fn next_event(&mut self) -> Option<DocumentEvent> {
        self.recv().await
    }
}

/// A navigation link in a [`HeadlessDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub href: String,
    pub text: String,
    pub active: bool,
}

/// In-memory page model.
///
/// Built from a full HTML document: the title, the main-content markup and
/// the navigation links are pulled out with the configured selectors. Shared
/// chrome outside those is not retained.
#[derive(Debug, Clone)]
pub struct HeadlessDocument {
    location: Url,
    title: String,
    main: Option<String>,
    body: String,
    nav: Vec<NavLink>,
    prefetch_selector: String,
    history: Vec<Url>,
    history_index: usize,
    scroll_y: u32,
    assigned: Vec<Url>,
    root_attributes: Vec<(String, String)>,
}

impl HeadlessDocument {
    /// Parse `html` loaded from `location`.
    pub fn from_html(location: Url, html: &str, config: &EngineConfig) -> NavResult<Self> {
        let content_sel = parse_selector(&config.content_selector)?;
        let nav_sel = parse_selector(&config.nav_link_selector)?;
        let body_sel = parse_selector("body")?;
        parse_selector(&config.prefetch_selector)?;

        let title = extract_fragment(html, &config.content_selector)?.title;
        let document = Html::parse_document(html);
        let main = document
            .select(&content_sel)
            .next()
            .map(|el| el.inner_html());
        let body = document
            .select(&body_sel)
            .next()
            .map(|el| el.inner_html())
            .unwrap_or_default();

        let nav = document
            .select(&nav_sel)
            .filter_map(|el| {
                let href = el.value().attr("href")?.to_string();
                Some(NavLink {
                    href,
                    text: el.text().collect::<String>().trim().to_string(),
                    active: el.value().classes().any(|c| c == "active"),
                })
            })
            .collect();

        Ok(Self {
            history: vec![location.clone()],
            history_index: 0,
            location,
            title,
            main,
            body,
            nav,
            prefetch_selector: config.prefetch_selector.clone(),
            scroll_y: 0,
            assigned: Vec::new(),
            root_attributes: Vec::new(),
        })
    }

    /// Move back one history entry, as the browser does before `popstate`.
    pub fn go_back(&mut self) -> Option<Url> {
        if self.history_index == 0 {
            return None;
        }
        self.history_index -= 1;
        self.location = self.history[self.history_index].clone();
        Some(self.location.clone())
    }

    /// Move forward one history entry.
    pub fn go_forward(&mut self) -> Option<Url> {
        if self.history_index + 1 >= self.history.len() {
            return None;
        }
        self.history_index += 1;
        self.location = self.history[self.history_index].clone();
        Some(self.location.clone())
    }

    pub fn history(&self) -> &[Url] {
        &self.history
    }

    pub fn nav(&self) -> &[NavLink] {
        &self.nav
    }

    /// `href` of the nav links currently marked active.
    pub fn active_nav_links(&self) -> Vec<&str> {
        self.nav
            .iter()
            .filter(|l| l.active)
            .map(|l| l.href.as_str())
            .collect()
    }

    /// URLs handed to full browser navigation.
    pub fn assigned_locations(&self) -> &[Url] {
        &self.assigned
    }

    pub fn scroll_y(&self) -> u32 {
        self.scroll_y
    }

    pub fn scroll_to(&mut self, y: u32) {
        self.scroll_y = y;
    }

    pub fn root_attribute(&self, name: &str) -> Option<&str> {
        self.root_attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn main_links(&self) -> Vec<LinkCandidate> {
        let (Some(main), Ok(sel)) = (&self.main, parse_selector(&self.prefetch_selector)) else {
            return Vec::new();
        };
        let fragment = Html::parse_fragment(main);
        fragment
            .select(&sel)
            .filter_map(|el| link_candidate(el.value()))
            .collect()
    }
}

fn link_candidate(el: &scraper::node::Element) -> Option<LinkCandidate> {
    let href = el.attr("href")?;
    Some(LinkCandidate {
        href: href.to_string(),
        target: el.attr("target").map(str::to_string),
        download: el.attr("download").is_some(),
    })
}

impl Document for HeadlessDocument {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn main_content(&self) -> String {
        self.main.clone().unwrap_or_default()
    }

    fn body_content(&self) -> String {
        self.body.clone()
    }

    fn replace_main_content(&mut self, html: &str) -> bool {
        match &mut self.main {
            Some(main) => {
                *main = html.to_string();
                true
            }
            None => false,
        }
    }

    fn push_history(&mut self, url: &Url) {
        self.history.truncate(self.history_index + 1);
        self.history.push(url.clone());
        self.history_index = self.history.len() - 1;
        self.location = url.clone();
    }

    fn assign_location(&mut self, url: &Url) {
        self.assigned.push(url.clone());
        self.push_history(url);
    }

    fn nav_links(&self) -> Vec<String> {
        self.nav.iter().map(|l| l.href.clone()).collect()
    }

    fn set_nav_link_active(&mut self, index: usize, active: bool) {
        if let Some(link) = self.nav.get_mut(index) {
            link.active = active;
        }
    }

    fn prefetchable_links(&self) -> Vec<LinkCandidate> {
        let mut links: Vec<LinkCandidate> = self
            .nav
            .iter()
            .map(|l| LinkCandidate::new(l.href.clone()))
            .collect();
        for link in self.main_links() {
            if !links.iter().any(|l| l.href == link.href) {
                links.push(link);
            }
        }
        links
    }

    fn scroll_to_top(&mut self) {
        self.scroll_y = 0;
    }

    fn set_root_attribute(&mut self, name: &str, value: &str) {
        match self.root_attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .root_attributes
                .push((name.to_string(), value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = r#"<html><head><title>Home</title></head><body>
<header><nav class="header-nav">
  <a href="/" class="active">Home</a>
  <a href="/projects">Projects</a>
  <a href="/diary">Diary</a>
</nav></header>
<main><div class="project-card"><a href="/projects/fastnav">fastnav</a></div><a href="/other">x</a></main>
</body></html>"#;

    fn doc() -> HeadlessDocument {
        HeadlessDocument::from_html(
            Url::parse("https://portfolio.test/").unwrap(),
            HOME,
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_structure() {
        let d = doc();
        assert_eq!(d.title(), "Home");
        assert_eq!(d.nav_links(), vec!["/", "/projects", "/diary"]);
        assert_eq!(d.active_nav_links(), vec!["/"]);
        assert_eq!(d.nav()[1].text, "Projects");
        assert!(d.main_content().contains("project-card"));
    }

    #[test]
    fn test_prefetchable_links_include_cards() {
        let hrefs: Vec<String> = doc()
            .prefetchable_links()
            .into_iter()
            .map(|l| l.href)
            .collect();
        assert_eq!(hrefs, vec!["/", "/projects", "/diary", "/projects/fastnav"]);
    }

    #[test]
    fn test_history_push_and_back() {
        let mut d = doc();
        let projects = Url::parse("https://portfolio.test/projects").unwrap();
        d.push_history(&projects);
        assert_eq!(d.location(), projects);

        let back = d.go_back().unwrap();
        assert_eq!(back.path(), "/");
        assert!(d.go_back().is_none());
        assert_eq!(d.go_forward().unwrap(), projects);
        assert!(d.go_forward().is_none());
    }

    #[test]
    fn test_missing_container() {
        let mut d = HeadlessDocument::from_html(
            Url::parse("https://portfolio.test/").unwrap(),
            "<html><body><p>no main</p></body></html>",
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(!d.replace_main_content("<p>x</p>"));
        assert_eq!(d.main_content(), "");
        assert_eq!(d.body_content(), "<p>no main</p>");
    }

    #[test]
    fn test_root_attribute() {
        let mut d = doc();
        d.set_root_attribute("data-theme", "dark");
        d.set_root_attribute("data-theme", "blue");
        assert_eq!(d.root_attribute("data-theme"), Some("blue"));
    }

    #[tokio::test]
    async fn test_channel_event_source() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(DocumentEvent::PopState).await.unwrap();
        drop(tx);
        assert_eq!(rx.next_event().await, Some(DocumentEvent::PopState));
        assert_eq!(rx.next_event().await, None);
    }
}
