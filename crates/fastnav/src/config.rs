//! Configuration loading and resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_MAX_CACHE_SIZE;
use crate::error::{NavError, NavResult};
use crate::extract::parse_selector;
use crate::fetch::DEFAULT_MARKER_HEADER;

/// Header pair identifying in-app fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMarker {
    pub header: String,
    pub value: String,
}

impl Default for RequestMarker {
    fn default() -> Self {
        Self {
            header: DEFAULT_MARKER_HEADER.0.to_string(),
            value: DEFAULT_MARKER_HEADER.1.to_string(),
        }
    }
}

/// Engine tunables. Every field has a default, so a partial JSON file works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_cache_size: usize,
    pub hover_debounce_ms: u64,
    pub content_selector: String,
    pub nav_link_selector: String,
    pub prefetch_selector: String,
    pub request_marker: RequestMarker,
    pub preload_all_delay_ms: u64,
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            hover_debounce_ms: 50,
            content_selector: "main".to_string(),
            nav_link_selector: ".header-nav a".to_string(),
            prefetch_selector: ".header-nav a, .project-card a".to_string(),
            request_marker: RequestMarker::default(),
            preload_all_delay_ms: 2000,
            fetch_timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn hover_debounce(&self) -> Duration {
        Duration::from_millis(self.hover_debounce_ms)
    }

    pub fn preload_all_delay(&self) -> Duration {
        Duration::from_millis(self.preload_all_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Apply `FASTNAV_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> NavResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FASTNAV_MAX_CACHE_SIZE") {
            self.max_cache_size = parse_env("FASTNAV_MAX_CACHE_SIZE", &v)?;
        }
        if let Some(v) = lookup("FASTNAV_HOVER_DEBOUNCE_MS") {
            self.hover_debounce_ms = parse_env("FASTNAV_HOVER_DEBOUNCE_MS", &v)?;
        }
        if let Some(v) = lookup("FASTNAV_CONTENT_SELECTOR") {
            self.content_selector = v;
        }
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> NavResult<()> {
        if self.max_cache_size == 0 {
            return Err(NavError::Config("max_cache_size must be at least 1".into()));
        }
        for selector in [
            &self.content_selector,
            &self.nav_link_selector,
            &self.prefetch_selector,
        ] {
            parse_selector(selector)?;
        }
        if self.request_marker.header.trim().is_empty() {
            return Err(NavError::Config("request_marker.header is empty".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> NavResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| NavError::Config(format!("{name}: cannot parse {value:?}")))
}

/// Resolve the config file path.
///
/// Order: explicit path, `FASTNAV_CONFIG`, `./.fastnav/config.json`,
/// `~/.fastnav/config.json`. Returns `None` when nothing exists, in which
/// case defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("FASTNAV_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".fastnav/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    dirs::home_dir()
        .map(|home| home.join(".fastnav").join("config.json"))
        .filter(|p| p.exists())
}

/// Load configuration from the resolved path, apply env overrides, validate.
pub fn load_config(explicit: Option<&Path>) -> NavResult<EngineConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            read_config_file(&path)?
        }
        None => EngineConfig::default(),
    };
    config.apply_env_overrides(|k| std::env::var(k).ok())?;
    config.validate()?;
    Ok(config)
}

/// Parse a JSON config file.
pub fn read_config_file(path: &Path) -> NavResult<EngineConfig> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_cache_size, 5);
        assert_eq!(config.hover_debounce(), Duration::from_millis(50));
        assert_eq!(config.content_selector, "main");
        assert_eq!(config.request_marker.header, "X-Requested-With");
        assert!(config.fetch_timeout().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r##"{"max_cache_size": 12, "content_selector": "#app"}"##).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.max_cache_size, 12);
        assert_eq!(config.content_selector, "#app");
        assert_eq!(config.hover_debounce_ms, 50);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FASTNAV_MAX_CACHE_SIZE", "9"),
            ("FASTNAV_HOVER_DEBOUNCE_MS", " 120 "),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_cache_size, 9);
        assert_eq!(config.hover_debounce_ms, 120);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "FASTNAV_MAX_CACHE_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, NavError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig {
            max_cache_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            nav_link_selector: "a[".into(),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(NavError::Selector(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, NavError::Io(_)));
    }
}
