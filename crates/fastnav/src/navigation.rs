//! Navigation controller — the single-flight page swap state machine.
//!
//! `Idle --navigate--> Navigating --(always)--> Idle`. A navigation arriving
//! while another is in progress is dropped, not queued. Content comes from
//! the fragment cache or, on a miss, from one fetch that also seeds the
//! cache. A failed fetch hands the URL to full browser navigation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use url::Url;

use crate::cache::SharedCache;
use crate::classifier::{canonical_url, resolve_href};
use crate::document::{lock_document, Document, SharedDocument};
use crate::events::{EngineEvent, EventBus};
use crate::fetch::PageFetcher;
use crate::prefetch::PrefetchScheduler;
use crate::reinit::{HookContext, PageReinitializer};
use crate::storage::KeyValueStore;
use crate::types::{NavState, NavigationOutcome, NavigationTrigger};

struct Inner {
    cache: SharedCache,
    prefetch: PrefetchScheduler,
    fetcher: Arc<dyn PageFetcher>,
    document: SharedDocument,
    store: Arc<dyn KeyValueStore>,
    reinit: PageReinitializer,
    events: Arc<EventBus>,
    navigating: AtomicBool,
}

/// Resets the navigating flag however the navigation ends.
struct NavigatingGuard<'a>(&'a AtomicBool);

impl Drop for NavigatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Performs in-place page swaps. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NavigationController {
    inner: Arc<Inner>,
}

impl NavigationController {
    pub fn new(
        cache: SharedCache,
        prefetch: PrefetchScheduler,
        fetcher: Arc<dyn PageFetcher>,
        document: SharedDocument,
        store: Arc<dyn KeyValueStore>,
        reinit: PageReinitializer,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                prefetch,
                fetcher,
                document,
                store,
                reinit,
                events,
                navigating: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> NavState {
        if self.is_navigating() {
            NavState::Navigating
        } else {
            NavState::Idle
        }
    }

    pub fn is_navigating(&self) -> bool {
        self.inner.navigating.load(Ordering::SeqCst)
    }

    /// Navigate to `url`, pushing it onto history on success.
    ///
    /// Dropped if a navigation is already in progress.
    pub async fn navigate(&self, url: &Url) -> NavigationOutcome {
        if self
            .inner
            .navigating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("navigation already in progress, dropping {url}");
            self.inner.events.emit(EngineEvent::NavigationDropped {
                url: url.to_string(),
            });
            return NavigationOutcome::Dropped;
        }
        let _guard = NavigatingGuard(&self.inner.navigating);
        self.load_page(url, NavigationTrigger::Link).await
    }

    /// Restore content for the location the browser moved to on back/forward.
    ///
    /// History is not pushed. Not subject to the single-flight guard: the
    /// browser has already changed the location, so dropping the restore
    /// would leave content and URL out of step.
    pub async fn restore_from_history(&self) -> NavigationOutcome {
        let url = lock_document(&self.inner.document).location();
        self.load_page(&url, NavigationTrigger::History).await
    }

    async fn load_page(&self, url: &Url, trigger: NavigationTrigger) -> NavigationOutcome {
        let key = canonical_url(url);
        let start = Instant::now();
        self.inner.events.emit(EngineEvent::NavigationStarted {
            url: key.clone(),
            trigger,
        });

        let (fragment, title, from_cache) = match self.inner.cache.get(&key) {
            Some(entry) => {
                tracing::debug!("cache hit: {key}");
                (entry.fragment, entry.title, true)
            }
            None => {
                tracing::debug!("cache miss: {key}");
                match self.inner.fetcher.fetch(&key).await {
                    Ok(html) => {
                        let page = self.inner.cache.seed(&key, &html);
                        self.inner.prefetch.cancel(&key);
                        (page.fragment, page.title, false)
                    }
                    Err(e) => {
                        tracing::warn!("navigation to {key} failed ({e}); falling back to full load");
                        self.inner.events.emit(EngineEvent::NavigationFallback {
                            url: key,
                            error: e.to_string(),
                        });
                        lock_document(&self.inner.document).assign_location(url);
                        return NavigationOutcome::FellBack;
                    }
                }
            }
        };

        self.swap_in(url, &fragment, &title, trigger);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!("navigated to {key} in {elapsed_ms}ms (cached: {from_cache})");
        self.inner.events.emit(EngineEvent::NavigationCompleted {
            url: key,
            from_cache,
            elapsed_ms,
        });
        NavigationOutcome::Completed { from_cache }
    }

    /// Replace content, update history and nav state, re-run page hooks.
    fn swap_in(&self, url: &Url, fragment: &str, title: &str, trigger: NavigationTrigger) {
        let mut document = lock_document(&self.inner.document);
        if !document.replace_main_content(fragment) {
            tracing::warn!("page has no main-content container; content not replaced");
        }
        document.set_title(title);
        if trigger.pushes_history() {
            document.push_history(url);
        }
        update_active_links(&mut *document);

        let location = document.location();
        let mut ctx = HookContext {
            url: &location,
            document: &mut *document,
            store: &*self.inner.store,
        };
        self.inner.reinit.reinitialize(&mut ctx, &self.inner.events);

        document.scroll_to_top();
    }
}

/// Mark each nav link active iff its path equals the current location's.
pub fn update_active_links(document: &mut dyn Document) {
    let location = document.location();
    let links = document.nav_links();
    for (index, href) in links.iter().enumerate() {
        let active = resolve_href(href, &location)
            .map(|resolved| resolved.path() == location.path())
            .unwrap_or(false);
        document.set_nav_link_active(index, active);
    }
}
