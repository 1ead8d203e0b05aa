//! Fastnav — client-side navigation cache and prefetch engine.
//!
//! Intercepts same-origin link navigation, caches main-content fragments,
//! prefetches on hover intent, and swaps page content without a full reload.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod navigation;
pub mod prefetch;
pub mod reinit;
pub mod storage;
pub mod timer;
pub mod types;

pub use cache::FragmentCache;
pub use classifier::{canonical_url, is_interceptable};
pub use config::{load_config, resolve_config_path, EngineConfig};
pub use document::{Document, DocumentEventSource, HeadlessDocument};
pub use engine::NavigationEngine;
pub use error::{NavError, NavResult};
pub use events::{EngineEvent, EventBus};
pub use extract::{extract_fragment, ExtractedPage};
pub use fetch::{HttpFetcher, PageFetcher};
pub use navigation::NavigationController;
pub use prefetch::PrefetchScheduler;
pub use reinit::{HookContext, PageHook, PageReinitializer};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
pub use types::*;
