//! Core data types shared across the engine.

use serde::{Deserialize, Serialize};

/// A cached page fragment keyed by canonical absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub fragment: String,
    pub title: String,
    /// Logical insertion clock; strictly increasing across `put` calls.
    pub inserted_at: u64,
}

/// A link element as seen by the classifier.
///
/// `href` is the raw attribute value; it is resolved against the current
/// document location at classification time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub href: String,
    pub target: Option<String>,
    pub download: bool,
}

impl LinkCandidate {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target: None,
            download: false,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }
}

/// An interaction reported by the document adapter.
///
/// Link-bearing events carry `None` when the interaction was not on (or
/// inside) a link element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "link", rename_all = "snake_case")]
pub enum DocumentEvent {
    Hover(Option<LinkCandidate>),
    HoverEnd(Option<LinkCandidate>),
    TouchStart(Option<LinkCandidate>),
    LinkVisible(Option<LinkCandidate>),
    Click(Option<LinkCandidate>),
    PopState,
}

/// What the adapter should do with the native event after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// The engine took over; suppress the browser default action.
    Intercepted,
    /// Let the browser handle the event natively.
    PassThrough,
}

/// How a navigation attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Content swapped in place.
    Completed { from_cache: bool },
    /// Another navigation was already in progress.
    Dropped,
    /// Fetch failed; the document was sent to the URL natively.
    FellBack,
    /// Same-page `#fragment` link, left to native anchor scrolling.
    Anchor,
}

/// How a prefetch request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefetchOutcome {
    /// Fetched and stored in the cache.
    Cached,
    /// Nothing to do: already cached or already in flight.
    Skipped,
    /// Fetch failed; queue membership cleared.
    Failed,
}

/// Navigation state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    Idle,
    Navigating,
}

/// Where a navigation request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTrigger {
    /// Link click or programmatic navigation; history is pushed.
    Link,
    /// Browser back/forward; history already moved.
    History,
}

impl NavigationTrigger {
    pub fn pushes_history(self) -> bool {
        matches!(self, NavigationTrigger::Link)
    }
}
