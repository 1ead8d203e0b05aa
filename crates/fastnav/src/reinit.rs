//! Page re-initialisation after a content swap.
//!
//! The swapped-in subtree carries none of the listeners bound to the old
//! nodes, so page features are re-run: at most one route hook chosen by the
//! new path, then every global hook. A failing or panicking hook is logged
//! and reported; the remaining hooks still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use url::Url;

use crate::document::Document;
use crate::events::{EngineEvent, EventBus};
use crate::storage::{load_diary_entries, load_theme, DiaryStats, KeyValueStore};

/// What a hook gets to work with.
pub struct HookContext<'a> {
    pub url: &'a Url,
    pub document: &'a mut dyn Document,
    pub store: &'a dyn KeyValueStore,
}

impl HookContext<'_> {
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A page feature initialiser.
pub trait PageHook: Send + Sync {
    fn name(&self) -> &str;
    fn init(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<()>;
}

/// Which hooks ran and which failed during one re-initialisation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReinitReport {
    pub ran: Vec<String>,
    pub failed: Vec<String>,
}

/// Dispatches route and global hooks.
#[derive(Default, Clone)]
pub struct PageReinitializer {
    routes: Vec<(String, Arc<dyn PageHook>)>,
    globals: Vec<Arc<dyn PageHook>>,
}

impl PageReinitializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in hooks: theme (global) and diary (route `diary`).
    pub fn with_defaults() -> Self {
        Self::new()
            .route("diary", Arc::new(DiaryHook))
            .global(Arc::new(ThemeHook))
    }

    /// Register a hook for paths containing `pattern`. Earlier routes win.
    pub fn route(mut self, pattern: &str, hook: Arc<dyn PageHook>) -> Self {
        self.routes.push((pattern.to_string(), hook));
        self
    }

    /// Register a hook that runs after every swap.
    pub fn global(mut self, hook: Arc<dyn PageHook>) -> Self {
        self.globals.push(hook);
        self
    }

    /// Route hook for `path`, if any.
    pub fn route_for(&self, path: &str) -> Option<&Arc<dyn PageHook>> {
        self.routes
            .iter()
            .find(|(pattern, _)| path.contains(pattern.as_str()))
            .map(|(_, hook)| hook)
    }

    /// Run the matching route hook, then all globals, then announce the page.
    pub fn reinitialize(&self, ctx: &mut HookContext<'_>, events: &EventBus) -> ReinitReport {
        let mut report = ReinitReport::default();
        let path = ctx.path().to_string();

        let hooks = self.route_for(&path).into_iter().chain(self.globals.iter());
        for hook in hooks {
            let name = hook.name().to_string();
            let result = catch_unwind(AssertUnwindSafe(|| hook.init(ctx)));
            let error = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{e:#}")),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };
            match error {
                None => report.ran.push(name),
                Some(error) => {
                    tracing::warn!("page hook {name} failed on {path}: {error}");
                    events.emit(EngineEvent::HookFailed {
                        hook: name.clone(),
                        error,
                    });
                    report.failed.push(name);
                }
            }
        }

        events.emit(EngineEvent::PageChanged { path });
        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Applies the saved theme to the document root.
pub struct ThemeHook;

impl PageHook for ThemeHook {
    fn name(&self) -> &str {
        "theme"
    }

    fn init(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<()> {
        let theme = load_theme(ctx.store);
        ctx.document.set_root_attribute("data-theme", &theme);
        Ok(())
    }
}

/// Loads diary entries for the diary page.
pub struct DiaryHook;

impl PageHook for DiaryHook {
    fn name(&self) -> &str {
        "diary"
    }

    fn init(&self, ctx: &mut HookContext<'_>) -> anyhow::Result<()> {
        let entries = load_diary_entries(ctx.store);
        let stats = DiaryStats::of(&entries);
        tracing::info!(
            "diary: {} entries ({} completed, {} in progress, {} planned)",
            stats.total,
            stats.completed,
            stats.in_progress,
            stats.planned
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::document::HeadlessDocument;
    use crate::storage::{save_theme, MemoryStore};
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl PageHook for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn init(&self, _ctx: &mut HookContext<'_>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("{} broke", self.name);
            }
            Ok(())
        }
    }

    struct Panicker;

    impl PageHook for Panicker {
        fn name(&self) -> &str {
            "panicker"
        }

        fn init(&self, _ctx: &mut HookContext<'_>) -> anyhow::Result<()> {
            panic!("listener wiring exploded");
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Arc<dyn PageHook> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
            fail,
        })
    }

    fn document(url: &Url) -> HeadlessDocument {
        HeadlessDocument::from_html(url.clone(), "<main></main>", &EngineConfig::default()).unwrap()
    }

    fn run(reinit: &PageReinitializer, path: &str) -> (ReinitReport, HeadlessDocument) {
        let url = Url::parse(&format!("https://portfolio.test{path}")).unwrap();
        let mut doc = document(&url);
        let store = MemoryStore::new();
        let bus = EventBus::new(16);
        let mut ctx = HookContext {
            url: &url,
            document: &mut doc,
            store: &store,
        };
        let report = reinit.reinitialize(&mut ctx, &bus);
        (report, doc)
    }

    #[test]
    fn test_first_matching_route_then_globals() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reinit = PageReinitializer::new()
            .route("projects", recorder("projects", &log, false))
            .route("diary", recorder("diary", &log, false))
            .route("contacts", recorder("contacts", &log, false))
            .global(recorder("theme", &log, false))
            .global(recorder("smooth-scroll", &log, false));

        let (report, _) = run(&reinit, "/diary");
        assert_eq!(*log.lock().unwrap(), vec!["diary", "theme", "smooth-scroll"]);
        assert!(report.failed.is_empty());

        log.lock().unwrap().clear();
        run(&reinit, "/about");
        assert_eq!(*log.lock().unwrap(), vec!["theme", "smooth-scroll"]);
    }

    #[test]
    fn test_failures_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reinit = PageReinitializer::new()
            .route("contacts", recorder("contacts", &log, true))
            .global(Arc::new(Panicker))
            .global(recorder("theme", &log, false));

        let (report, _) = run(&reinit, "/contacts");
        assert_eq!(report.failed, vec!["contacts", "panicker"]);
        assert_eq!(report.ran, vec!["theme"]);
        assert_eq!(*log.lock().unwrap(), vec!["contacts", "theme"]);
    }

    #[test]
    fn test_page_changed_and_hook_failed_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let reinit = PageReinitializer::new().global(recorder("bad", &log, true));
        let url = Url::parse("https://portfolio.test/projects").unwrap();
        let mut doc = document(&url);
        let store = MemoryStore::new();
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let mut ctx = HookContext {
            url: &url,
            document: &mut doc,
            store: &store,
        };
        reinit.reinitialize(&mut ctx, &bus);

        assert!(matches!(rx.try_recv().unwrap(), EngineEvent::HookFailed { hook, .. } if hook == "bad"));
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::PageChanged {
                path: "/projects".into()
            }
        );
    }

    #[test]
    fn test_theme_hook_applies_saved_theme() {
        let url = Url::parse("https://portfolio.test/").unwrap();
        let mut doc = document(&url);
        let store = MemoryStore::new();
        save_theme(&store, "purple").unwrap();
        let mut ctx = HookContext {
            url: &url,
            document: &mut doc,
            store: &store,
        };
        PageReinitializer::with_defaults().reinitialize(&mut ctx, &EventBus::new(4));
        assert_eq!(doc.root_attribute("data-theme"), Some("purple"));
    }
}
