//! `fastnav browse <start> [paths...]` — navigate a live site in place.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use url::Url;

use fastnav::events::event_url;
use fastnav::{
    Document, EngineConfig, FileStore, HeadlessDocument, HttpFetcher, KeyValueStore, MemoryStore,
    NavigationEngine, NavigationOutcome, PageFetcher,
};

use super::output::{json_line, preview};

pub struct BrowseOptions {
    pub start: String,
    pub paths: Vec<String>,
    pub back: usize,
    pub prefetch: bool,
    pub state: Option<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct StepReport<'a> {
    step: usize,
    action: &'a str,
    outcome: NavigationOutcome,
    location: String,
    title: String,
    cached: Vec<String>,
}

/// Run the browse command.
pub async fn run(config: EngineConfig, opts: BrowseOptions) -> Result<()> {
    let start = Url::parse(&opts.start).with_context(|| format!("invalid start URL: {}", opts.start))?;

    let marker = &config.request_marker;
    let fetcher = Arc::new(HttpFetcher::new(
        (marker.header.as_str(), marker.value.as_str()),
        config.fetch_timeout(),
    )?);
    let html = fetcher
        .fetch(start.as_str())
        .await
        .with_context(|| format!("failed to load {start}"))?;

    let document = Arc::new(Mutex::new(HeadlessDocument::from_html(start, &html, &config)?));
    let store: Arc<dyn KeyValueStore> = match &opts.state {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };

    let engine = NavigationEngine::builder(document.clone())
        .config(config)
        .fetcher(fetcher)
        .store(store)
        .build()?;

    let mut events = engine.subscribe();
    let json = opts.json;
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if json {
                json_line(&event);
            } else {
                tracing::info!("{} {:?}", event_url(&event).unwrap_or("-"), event);
            }
        }
    });

    let preload = if opts.prefetch {
        Some(engine.start())
    } else {
        engine.clear_cache();
        None
    };

    let mut step = 0;
    for href in &opts.paths {
        step += 1;
        let outcome = engine.navigate_href(href).await?;
        report(&engine, &document, step, href, outcome, opts.json)?;
        if outcome == NavigationOutcome::FellBack {
            break;
        }
    }

    for _ in 0..opts.back {
        let moved = lock(&document)?.go_back();
        if moved.is_none() {
            break;
        }
        step += 1;
        let outcome = engine.restore_from_history().await;
        report(&engine, &document, step, "back", outcome, opts.json)?;
    }

    if let Some(preload) = preload {
        preload.cancel();
    }
    printer.abort();
    Ok(())
}

fn lock(document: &Mutex<HeadlessDocument>) -> Result<std::sync::MutexGuard<'_, HeadlessDocument>> {
    document.lock().map_err(|_| anyhow!("document lock poisoned"))
}

fn report(
    engine: &NavigationEngine,
    document: &Mutex<HeadlessDocument>,
    step: usize,
    action: &str,
    outcome: NavigationOutcome,
    json: bool,
) -> Result<()> {
    let doc = lock(document)?;
    let report = StepReport {
        step,
        action,
        outcome,
        location: doc.location().to_string(),
        title: doc.title(),
        cached: engine.cache().keys(),
    };

    if json {
        json_line(&report);
        return Ok(());
    }

    let outcome = match outcome {
        NavigationOutcome::Completed { from_cache: true } => "swapped (cache)",
        NavigationOutcome::Completed { from_cache: false } => "swapped (fetched)",
        NavigationOutcome::Dropped => "dropped",
        NavigationOutcome::FellBack => "full navigation",
        NavigationOutcome::Anchor => "in-page anchor",
    };
    println!("[{}] {} → {}", report.step, report.action, outcome);
    println!("    location: {}", report.location);
    println!("    title:    {}", report.title);
    println!("    content:  {}", preview(&doc.main_content(), 72));
    let nav: Vec<String> = doc
        .nav()
        .iter()
        .map(|link| {
            if link.active {
                format!("[{}]", link.text)
            } else {
                link.text.clone()
            }
        })
        .collect();
    println!("    nav:      {}", nav.join(" "));
    println!("    cached:   {} page(s)", report.cached.len());
    for key in &report.cached {
        println!("      - {key}");
    }
    Ok(())
}
