//! Prefetch scheduling — fetch pages ahead of navigation.
//!
//! Hover intent goes through a short debounce so a pointer passing over a
//! link does not cost a request; touch and visibility fetch immediately.
//! The queue is a best-effort hint set: a URL is in it while its prefetch is
//! scheduled or in flight and leaves it on completion, failure or cancel.
//! Failures are never surfaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;

use crate::cache::SharedCache;
use crate::events::{EngineEvent, EventBus};
use crate::fetch::PageFetcher;
use crate::timer::{Timer, TimerHandle};
use crate::types::PrefetchOutcome;

enum QueueState {
    /// Waiting out the debounce.
    Scheduled(TimerHandle),
    /// Request issued; runs to completion.
    InFlight,
}

struct Inner {
    cache: SharedCache,
    fetcher: Arc<dyn PageFetcher>,
    timer: Arc<dyn Timer>,
    events: Arc<EventBus>,
    debounce: Duration,
    queue: Mutex<HashMap<String, QueueState>>,
}

/// Deduplicating prefetcher. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PrefetchScheduler {
    inner: Arc<Inner>,
}

impl PrefetchScheduler {
    pub fn new(
        cache: SharedCache,
        fetcher: Arc<dyn PageFetcher>,
        timer: Arc<dyn Timer>,
        events: Arc<EventBus>,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                timer,
                events,
                debounce,
                queue: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn queue(&self) -> MutexGuard<'_, HashMap<String, QueueState>> {
        self.inner.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a debounced prefetch. No-op if `url` is cached or queued.
    ///
    /// Returns whether a new prefetch was scheduled.
    pub fn schedule_prefetch(&self, url: &str) -> bool {
        if self.inner.cache.contains(url) {
            return false;
        }
        let mut queue = self.queue();
        if queue.contains_key(url) {
            return false;
        }

        let this = self.clone();
        let key = url.to_string();
        let handle = self
            .inner
            .timer
            .schedule_after(self.inner.debounce, async move { this.fire(key).await }.boxed());
        queue.insert(url.to_string(), QueueState::Scheduled(handle));
        drop(queue);

        tracing::debug!("prefetch scheduled: {url}");
        self.inner.events.emit(EngineEvent::PrefetchScheduled {
            url: url.to_string(),
            delay_ms: self.inner.debounce.as_millis() as u64,
        });
        true
    }

    /// Withdraw a prefetch that is still waiting out the debounce.
    ///
    /// In-flight requests are not cancelled; returns `false` for those and
    /// for URLs not queued.
    pub fn cancel(&self, url: &str) -> bool {
        let mut queue = self.queue();
        match queue.get(url) {
            Some(QueueState::Scheduled(handle)) => {
                handle.cancel();
                queue.remove(url);
                drop(queue);
                tracing::debug!("prefetch cancelled: {url}");
                self.inner.events.emit(EngineEvent::PrefetchCancelled {
                    url: url.to_string(),
                });
                true
            }
            _ => false,
        }
    }

    /// Fetch immediately, bypassing the debounce.
    ///
    /// A pending debounced prefetch for the same URL is absorbed; an
    /// in-flight one makes this a no-op.
    pub async fn prefetch_now(&self, url: &str) -> PrefetchOutcome {
        if self.inner.cache.contains(url) {
            return PrefetchOutcome::Skipped;
        }
        {
            let mut queue = self.queue();
            match queue.get(url) {
                Some(QueueState::InFlight) => return PrefetchOutcome::Skipped,
                Some(QueueState::Scheduled(handle)) => handle.cancel(),
                None => {}
            }
            queue.insert(url.to_string(), QueueState::InFlight);
        }
        self.fetch_into_cache(url).await
    }

    /// Whether `url` is scheduled or in flight.
    pub fn is_queued(&self, url: &str) -> bool {
        self.queue().contains_key(url)
    }

    pub fn queued(&self) -> usize {
        self.queue().len()
    }

    /// Debounce expiry: fetch only if still scheduled.
    async fn fire(&self, url: String) {
        {
            let mut queue = self.queue();
            match queue.get(&url) {
                Some(QueueState::Scheduled(_)) => {
                    queue.insert(url.clone(), QueueState::InFlight);
                }
                _ => return,
            }
        }
        self.fetch_into_cache(&url).await;
    }

    async fn fetch_into_cache(&self, url: &str) -> PrefetchOutcome {
        if self.inner.cache.contains(url) {
            self.queue().remove(url);
            return PrefetchOutcome::Skipped;
        }

        let start = Instant::now();
        let outcome = match self.inner.fetcher.fetch(url).await {
            Ok(html) => {
                self.inner.cache.seed(url, &html);
                tracing::debug!("prefetched {url}");
                self.inner.events.emit(EngineEvent::PrefetchCompleted {
                    url: url.to_string(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
                PrefetchOutcome::Cached
            }
            Err(e) => {
                tracing::debug!("prefetch failed for {url}: {e}");
                self.inner.events.emit(EngineEvent::PrefetchFailed {
                    url: url.to_string(),
                    error: e.to_string(),
                });
                PrefetchOutcome::Failed
            }
        };
        self.queue().remove(url);
        outcome
    }
}
