//! Engine event bus — typed events from every component.
//!
//! A `tokio::sync::broadcast` channel carrying [`EngineEvent`] values. Any
//! consumer (CLI output, a page adapter, tests) can subscribe independently.
//! With no subscribers, events are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::NavigationTrigger;

/// Every event the engine emits. Serialized to JSON for CLI streaming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    // ── Prefetch ──────────────────────────
    /// A hover-intent prefetch was queued behind the debounce.
    PrefetchScheduled { url: String, delay_ms: u64 },
    /// A queued prefetch was withdrawn before it fired.
    PrefetchCancelled { url: String },
    /// A prefetch stored its page in the cache.
    PrefetchCompleted { url: String, elapsed_ms: u64 },
    /// A prefetch failed; never shown to the user.
    PrefetchFailed { url: String, error: String },

    // ── Navigation ────────────────────────
    /// A navigation acquired the single-flight guard.
    NavigationStarted {
        url: String,
        trigger: NavigationTrigger,
    },
    /// Content was swapped in place.
    NavigationCompleted {
        url: String,
        from_cache: bool,
        elapsed_ms: u64,
    },
    /// A navigation arrived while another was in progress.
    NavigationDropped { url: String },
    /// The fetch failed and the document was sent to the URL natively.
    NavigationFallback { url: String, error: String },

    // ── Cache ─────────────────────────────
    /// An entry was evicted to respect the bound.
    CacheEvicted { url: String },

    // ── Page lifecycle ────────────────────
    /// Re-initialisation finished for a new page.
    PageChanged { path: String },
    /// A re-initialisation hook failed; other hooks still ran.
    HookFailed { hook: String, error: String },
}

/// The central event bus for the engine.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// URL an event refers to, if any.
pub fn event_url(event: &EngineEvent) -> Option<&str> {
    match event {
        EngineEvent::PrefetchScheduled { url, .. }
        | EngineEvent::PrefetchCancelled { url }
        | EngineEvent::PrefetchCompleted { url, .. }
        | EngineEvent::PrefetchFailed { url, .. }
        | EngineEvent::NavigationStarted { url, .. }
        | EngineEvent::NavigationCompleted { url, .. }
        | EngineEvent::NavigationDropped { url }
        | EngineEvent::NavigationFallback { url, .. }
        | EngineEvent::CacheEvicted { url } => Some(url),
        EngineEvent::PageChanged { .. } | EngineEvent::HookFailed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = EngineEvent::NavigationCompleted {
            url: "https://site.test/projects".to_string(),
            from_cache: false,
            elapsed_ms: 12,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"NavigationCompleted\""));
        assert!(json.contains("site.test/projects"));

        let parsed: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_trigger_serialized_snake_case() {
        let event = EngineEvent::NavigationStarted {
            url: "u".into(),
            trigger: NavigationTrigger::History,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"trigger\":\"history\""));
    }

    #[test]
    fn test_event_bus_emit_no_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(EngineEvent::PageChanged { path: "/".into() });
    }

    #[test]
    fn test_event_bus_subscribe_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::CacheEvicted {
            url: "https://site.test/a".into(),
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event_url(&event), Some("https://site.test/a"));
    }
}
