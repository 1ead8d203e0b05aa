//! `fastnav extract <source>` — show what the engine would cache for a page.

use anyhow::{Context, Result};
use serde_json::json;

use fastnav::{extract_fragment, EngineConfig, HttpFetcher, PageFetcher};

use super::output::json_line;

/// Run the extract command.
pub async fn run(config: &EngineConfig, source: &str, selector: &str, json: bool) -> Result<()> {
    let html = if source.starts_with("http://") || source.starts_with("https://") {
        let marker = &config.request_marker;
        let fetcher = HttpFetcher::new(
            (marker.header.as_str(), marker.value.as_str()),
            config.fetch_timeout(),
        )?;
        fetcher
            .fetch(source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };

    let page = extract_fragment(&html, selector)?;

    if json {
        json_line(&json!({
            "source": source,
            "selector": selector,
            "title": page.title,
            "fragment": page.fragment,
        }));
    } else {
        println!("title: {}", page.title);
        println!("{}", page.fragment);
    }
    Ok(())
}
