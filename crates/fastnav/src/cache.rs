//! Fragment cache — bounded store of page fragments keyed by canonical URL.
//!
//! ## Eviction
//!
//! Pure insertion-time recency. Every `put` stamps the entry with the next
//! value of a logical clock; when the cache exceeds `max_entries` after a
//! `put`, the entry with the smallest stamp is removed. Reads never touch
//! the stamps, so this is deliberately *not* LRU.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{EngineEvent, EventBus};
use crate::extract::{ExtractedPage, FragmentExtractor};
use crate::types::CacheEntry;

/// Default bound on cached fragments.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 5;

/// In-memory fragment cache with insertion-order eviction.
#[derive(Debug)]
pub struct FragmentCache {
    entries: HashMap<String, CacheEntry>,
    max_entries: usize,
    clock: u64,
    extractor: FragmentExtractor,
}

impl FragmentCache {
    /// Create a cache bounded to `max_entries` (at least one).
    pub fn new(max_entries: usize, extractor: FragmentExtractor) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            clock: 0,
            extractor,
        }
    }

    /// Look up a fragment. Does not affect eviction order.
    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Insert or overwrite an entry, then enforce the bound.
    ///
    /// Returns the evicted entry, if any.
    pub fn put(&mut self, url: &str, fragment: String, title: String) -> Option<CacheEntry> {
        self.clock += 1;
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                key: url.to_string(),
                fragment,
                title,
                inserted_at: self.clock,
            },
        );
        self.evict_oldest()
    }

    /// Derive `(fragment, title)` from a full HTML document and `put` it.
    pub fn seed(&mut self, url: &str, raw_html: &str) -> Option<CacheEntry> {
        let page = self.extractor.extract(raw_html);
        self.put(url, page.fragment, page.title)
    }

    pub fn extractor(&self) -> &FragmentExtractor {
        &self.extractor
    }

    /// Remove every entry. The logical clock keeps running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Cached keys, oldest first.
    pub fn keys(&self) -> Vec<String> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.inserted_at);
        entries.into_iter().map(|e| e.key.clone()).collect()
    }

    fn evict_oldest(&mut self) -> Option<CacheEntry> {
        if self.entries.len() <= self.max_entries {
            return None;
        }
        let oldest = self
            .entries
            .values()
            .min_by_key(|e| e.inserted_at)
            .map(|e| e.key.clone())?;
        tracing::info!("evicting cached fragment: {oldest}");
        self.entries.remove(&oldest)
    }
}

/// Cache handle shared by the prefetch scheduler and the navigation
/// controller.
///
/// The lock is never held across an await point, so every operation is
/// atomic with respect to the event loop. Evictions are announced on the
/// event bus.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<Mutex<FragmentCache>>,
    events: Arc<EventBus>,
}

impl SharedCache {
    pub fn new(cache: FragmentCache, events: Arc<EventBus>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FragmentCache> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, url: &str) -> Option<CacheEntry> {
        self.lock().get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    pub fn put(&self, url: &str, fragment: String, title: String) {
        let evicted = self.lock().put(url, fragment, title);
        self.announce(evicted);
    }

    /// Seed from a full document, returning what was stored.
    pub fn seed(&self, url: &str, raw_html: &str) -> ExtractedPage {
        let (page, evicted) = {
            let mut cache = self.lock();
            let page = cache.extractor().extract(raw_html);
            let evicted = cache.put(url, page.fragment.clone(), page.title.clone());
            (page, evicted)
        };
        self.announce(evicted);
        page
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys()
    }

    fn announce(&self, evicted: Option<CacheEntry>) {
        if let Some(entry) = evicted {
            self.events.emit(EngineEvent::CacheEvicted { url: entry.key });
        }
    }
}
