//! Persisted key-value state read by the page hooks.
//!
//! Two well-known keys are understood here: the saved theme preference
//! (bare string) and the diary entries (JSON array of records).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};

/// Storage key for the theme preference.
pub const THEME_KEY: &str = "portfolio-theme";
/// Storage key for diary entries.
pub const DIARY_KEY: &str = "diaryEntries";

/// Themes the site ships with; the first is the default.
pub const THEMES: &[&str] = &["orange", "dark", "blue", "green", "purple"];

/// String key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> NavResult<()>;
    fn remove(&self, key: &str) -> NavResult<()>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Volatile in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> NavResult<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> NavResult<()> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open or create a store at `path`.
    pub fn open(path: &Path) -> NavResult<Self> {
        let values = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };
        tracing::debug!("FileStore opened: {} keys from {}", values.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> NavResult<()> {
        let data = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, data).map_err(|e| {
            NavError::Storage(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> NavResult<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> NavResult<()> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

// ── Theme ─────────────────────────────────

/// Saved theme, or the default when missing or unknown.
pub fn load_theme(store: &dyn KeyValueStore) -> String {
    store
        .get(THEME_KEY)
        .filter(|t| THEMES.contains(&t.as_str()))
        .unwrap_or_else(|| THEMES[0].to_string())
}

/// Persist a theme choice. Unknown themes are rejected.
pub fn save_theme(store: &dyn KeyValueStore, theme: &str) -> NavResult<()> {
    if !THEMES.contains(&theme) {
        return Err(NavError::Storage(format!("unknown theme: {theme}")));
    }
    store.set(THEME_KEY, theme)
}

// ── Diary ─────────────────────────────────

/// Progress state of a diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiaryStatus {
    Planned,
    InProgress,
    Completed,
}

/// One diary record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Creation timestamp in milliseconds.
    pub id: u64,
    pub date: String,
    pub title: String,
    pub description: String,
    pub status: DiaryStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiaryStats {
    pub total: usize,
    pub planned: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl DiaryStats {
    pub fn of(entries: &[DiaryEntry]) -> Self {
        let mut stats = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match entry.status {
                DiaryStatus::Planned => stats.planned += 1,
                DiaryStatus::InProgress => stats.in_progress += 1,
                DiaryStatus::Completed => stats.completed += 1,
            }
        }
        stats
    }
}

/// Load diary entries. Missing or corrupt data reads as empty.
pub fn load_diary_entries(store: &dyn KeyValueStore) -> Vec<DiaryEntry> {
    let Some(raw) = store.get(DIARY_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("ignoring corrupt diary entries: {e}");
            Vec::new()
        }
    }
}

/// Persist diary entries in order.
pub fn save_diary_entries(store: &dyn KeyValueStore, entries: &[DiaryEntry]) -> NavResult<()> {
    let raw = serde_json::to_string(entries)?;
    store.set(DIARY_KEY, &raw)
}
