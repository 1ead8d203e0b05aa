//! Navigation engine — one instance per page session.
//!
//! Owns the fragment cache, the prefetch queue and the navigation state,
//! and routes document interactions: hover schedules a debounced prefetch,
//! touch and visibility prefetch immediately, clicks navigate in place,
//! back/forward restores content for the new location.

use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::broadcast;
use url::Url;

use crate::cache::{FragmentCache, SharedCache};
use crate::classifier::{canonical_url, is_interceptable, resolve_href};
use crate::config::EngineConfig;
use crate::document::{lock_document, DocumentEventSource, SharedDocument};
use crate::error::NavResult;
use crate::events::{EngineEvent, EventBus};
use crate::extract::FragmentExtractor;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::navigation::NavigationController;
use crate::prefetch::PrefetchScheduler;
use crate::reinit::PageReinitializer;
use crate::storage::{load_theme, KeyValueStore, MemoryStore};
use crate::timer::{Timer, TimerHandle, TokioTimer};
use crate::types::{DocumentEvent, EventDisposition, LinkCandidate, NavigationOutcome, PrefetchOutcome};

/// Builder for [`NavigationEngine`]. Anything not set gets a default.
pub struct EngineBuilder {
    document: SharedDocument,
    config: EngineConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    timer: Option<Arc<dyn Timer>>,
    store: Option<Arc<dyn KeyValueStore>>,
    reinit: Option<PageReinitializer>,
    events: Option<Arc<EventBus>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn reinitializer(mut self, reinit: PageReinitializer) -> Self {
        self.reinit = Some(reinit);
        self
    }

    pub fn events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> NavResult<NavigationEngine> {
        self.config.validate()?;
        let config = self.config;

        let fetcher: Arc<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let marker = &config.request_marker;
                Arc::new(HttpFetcher::new(
                    (marker.header.as_str(), marker.value.as_str()),
                    config.fetch_timeout(),
                )?)
            }
        };
        let timer = self.timer.unwrap_or_else(|| Arc::new(TokioTimer));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let reinit = self.reinit.unwrap_or_else(PageReinitializer::with_defaults);
        let events = self.events.unwrap_or_default();

        let extractor = FragmentExtractor::new(&config.content_selector)?;
        let cache = SharedCache::new(
            FragmentCache::new(config.max_cache_size, extractor),
            events.clone(),
        );
        let prefetch = PrefetchScheduler::new(
            cache.clone(),
            fetcher.clone(),
            timer.clone(),
            events.clone(),
            config.hover_debounce(),
        );
        let controller = NavigationController::new(
            cache.clone(),
            prefetch.clone(),
            fetcher,
            self.document.clone(),
            store.clone(),
            reinit,
            events.clone(),
        );

        Ok(NavigationEngine {
            inner: Arc::new(EngineInner {
                config,
                cache,
                prefetch,
                controller,
                document: self.document,
                timer,
                store,
                events,
            }),
        })
    }
}

struct EngineInner {
    config: EngineConfig,
    cache: SharedCache,
    prefetch: PrefetchScheduler,
    controller: NavigationController,
    document: SharedDocument,
    timer: Arc<dyn Timer>,
    store: Arc<dyn KeyValueStore>,
    events: Arc<EventBus>,
}

/// The fast-navigation engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NavigationEngine {
    inner: Arc<EngineInner>,
}

impl NavigationEngine {
    pub fn builder(document: SharedDocument) -> EngineBuilder {
        EngineBuilder {
            document,
            config: EngineConfig::default(),
            fetcher: None,
            timer: None,
            store: None,
            reinit: None,
            events: None,
        }
    }

    /// Page-load setup: apply the saved theme, cache the current page,
    /// prefetch visible links and schedule `preload_all`.
    ///
    /// Must run inside a tokio runtime; visible-link prefetches are spawned.
    pub fn start(&self) -> TimerHandle {
        {
            let mut document = lock_document(&self.inner.document);
            let theme = load_theme(&*self.inner.store);
            document.set_root_attribute("data-theme", &theme);
        }
        self.cache_current_page();

        for link in self.prefetchable_links() {
            self.spawn_prefetch(canonical_url(&link));
        }

        let engine = self.clone();
        let handle = self.inner.timer.schedule_after(
            self.inner.config.preload_all_delay(),
            async move {
                engine.preload_all().await;
            }
            .boxed(),
        );
        tracing::info!("fast navigation initialized");
        handle
    }

    /// Route one document interaction.
    ///
    /// Returns whether the adapter must suppress the browser default. Hover
    /// scheduling and cancellation happen before this returns; fetches and
    /// navigations are spawned onto the runtime.
    pub fn handle_event(&self, event: DocumentEvent) -> EventDisposition {
        match event {
            DocumentEvent::Hover(link) => {
                if let Some(url) = self.interceptable_url(link.as_ref()) {
                    self.inner.prefetch.schedule_prefetch(&canonical_url(&url));
                }
                EventDisposition::PassThrough
            }
            DocumentEvent::HoverEnd(link) => {
                if let Some(url) = self.interceptable_url(link.as_ref()) {
                    self.inner.prefetch.cancel(&canonical_url(&url));
                }
                EventDisposition::PassThrough
            }
            DocumentEvent::TouchStart(link) | DocumentEvent::LinkVisible(link) => {
                if let Some(url) = self.interceptable_url(link.as_ref()) {
                    self.spawn_prefetch(canonical_url(&url));
                }
                EventDisposition::PassThrough
            }
            DocumentEvent::Click(link) => match self.interceptable_url(link.as_ref()) {
                Some(url) => {
                    let controller = self.inner.controller.clone();
                    tokio::spawn(async move { controller.navigate(&url).await });
                    EventDisposition::Intercepted
                }
                None => EventDisposition::PassThrough,
            },
            DocumentEvent::PopState => {
                let controller = self.inner.controller.clone();
                tokio::spawn(async move { controller.restore_from_history().await });
                EventDisposition::PassThrough
            }
        }
    }

    /// Feed every event from `source` to [`handle_event`](Self::handle_event)
    /// until the source closes.
    pub async fn run<S: DocumentEventSource>(&self, mut source: S) {
        while let Some(event) = source.next_event().await {
            tracing::trace!("document event: {event:?}");
            self.handle_event(event);
        }
        tracing::debug!("document event source closed");
    }

    /// Navigate in place to `url`.
    pub async fn navigate(&self, url: &Url) -> NavigationOutcome {
        self.inner.controller.navigate(url).await
    }

    /// Navigate to a raw `href` resolved against the current location.
    ///
    /// Hrefs the classifier rejects go straight to full browser navigation,
    /// except same-page anchors, which leave the document untouched.
    pub async fn navigate_href(&self, href: &str) -> NavResult<NavigationOutcome> {
        let link = LinkCandidate::new(href);
        if let Some(url) = self.interceptable_url(Some(&link)) {
            return Ok(self.navigate(&url).await);
        }
        let location = lock_document(&self.inner.document).location();
        let url = location.join(href.trim())?;
        if url.fragment().is_some_and(|f| !f.is_empty())
            && canonical_url(&url) == canonical_url(&location)
        {
            tracing::debug!("in-page anchor {href}; leaving to the browser");
            return Ok(NavigationOutcome::Anchor);
        }
        lock_document(&self.inner.document).assign_location(&url);
        Ok(NavigationOutcome::FellBack)
    }

    /// Restore content after the browser moved through history.
    pub async fn restore_from_history(&self) -> NavigationOutcome {
        self.inner.controller.restore_from_history().await
    }

    /// Queue a debounced prefetch for `url`.
    pub fn schedule_prefetch(&self, url: &Url) -> bool {
        self.inner.prefetch.schedule_prefetch(&canonical_url(url))
    }

    /// Prefetch `url` now.
    pub async fn prefetch_now(&self, url: &Url) -> PrefetchOutcome {
        self.inner.prefetch.prefetch_now(&canonical_url(url)).await
    }

    /// Prefetch every eligible navigation link concurrently.
    pub async fn preload_all(&self) -> Vec<PrefetchOutcome> {
        let urls: Vec<String> = {
            let document = lock_document(&self.inner.document);
            let location = document.location();
            document
                .nav_links()
                .into_iter()
                .map(LinkCandidate::new)
                .filter(|link| is_interceptable(Some(link), &location))
                .filter_map(|link| resolve_href(&link.href, &location))
                .map(|url| canonical_url(&url))
                .collect()
        };
        let prefetch = &self.inner.prefetch;
        join_all(urls.iter().map(|url| prefetch.prefetch_now(url))).await
    }

    /// Drop every cached fragment, then re-cache the current page.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        self.cache_current_page();
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.controller.is_navigating()
    }

    pub fn cache(&self) -> &SharedCache {
        &self.inner.cache
    }

    pub fn prefetcher(&self) -> &PrefetchScheduler {
        &self.inner.prefetch
    }

    pub fn controller(&self) -> &NavigationController {
        &self.inner.controller
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    fn cache_current_page(&self) {
        let (url, fragment, title) = {
            let document = lock_document(&self.inner.document);
            let mut fragment = document.main_content();
            if fragment.is_empty() {
                fragment = document.body_content();
            }
            (canonical_url(&document.location()), fragment, document.title())
        };
        tracing::debug!("caching current page: {url}");
        self.inner.cache.put(&url, fragment, title);
    }

    fn interceptable_url(&self, link: Option<&LinkCandidate>) -> Option<Url> {
        let location = lock_document(&self.inner.document).location();
        if !is_interceptable(link, &location) {
            return None;
        }
        link.and_then(|l| resolve_href(&l.href, &location))
    }

    fn prefetchable_links(&self) -> Vec<Url> {
        let document = lock_document(&self.inner.document);
        let location = document.location();
        document
            .prefetchable_links()
            .iter()
            .filter(|link| is_interceptable(Some(*link), &location))
            .filter_map(|link| resolve_href(&link.href, &location))
            .collect()
    }

    fn spawn_prefetch(&self, url: String) {
        let prefetch = self.inner.prefetch.clone();
        tokio::spawn(async move { prefetch.prefetch_now(&url).await });
    }
}
