//! Process-lifetime key/value caches
//!
//! Two caches share the same shape but have different keyspaces and
//! population policies: the option cache is bulk-loaded once from the
//! external option namespace, the file-metadata cache fills lazily and only
//! when the caller opts in. Both are explicit objects constructed at runtime
//! start and injected where needed; nothing here is global.

#![allow(dead_code)] // cache accessors kept for renderer-side consumers

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::UNIX_EPOCH;

use crate::telemetry::{EVENT_CACHE_GET, Telemetry};

/// Recognized namespace prefix for runtime options
pub const OPTION_PREFIX: &str = "@tickbar_";

/// Plain string-to-string mapping, insertion-ordered
#[derive(Debug, Clone, Default)]
pub struct KvCache {
    entries: IndexMap<String, String>,
}

impl KvCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// External source of configuration options
pub trait OptionSource {
    /// Fetch a single option by exact key
    fn fetch(&self, key: &str) -> Option<String>;

    /// List all `(key, value)` pairs whose key carries `prefix`
    fn list_prefixed(&self, prefix: &str) -> Vec<(String, String)>;
}

/// Options read from the running tmux server
#[derive(Debug, Default)]
pub struct TmuxOptions;

impl OptionSource for TmuxOptions {
    fn fetch(&self, key: &str) -> Option<String> {
        let output = Command::new("tmux")
            .args(["show-option", "-gqv", key])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let value = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        if value.is_empty() { None } else { Some(value) }
    }

    fn list_prefixed(&self, prefix: &str) -> Vec<(String, String)> {
        let output = match Command::new("tmux").args(["show-options", "-g"]).output() {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                log::warn!(
                    "tmux show-options failed: {}",
                    String::from_utf8_lossy(&o.stderr).trim_end()
                );
                return Vec::new();
            }
            Err(e) => {
                log::warn!("Failed to run tmux: {}", e);
                return Vec::new();
            }
        };

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(parse_option_line)
            .filter(|(k, _)| k.starts_with(prefix))
            .collect()
    }
}

/// In-memory option source for tests and offline use
#[derive(Debug, Default)]
pub struct StaticOptions {
    values: IndexMap<String, String>,
}

impl StaticOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl OptionSource for StaticOptions {
    fn fetch(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn list_prefixed(&self, prefix: &str) -> Vec<(String, String)> {
        self.values
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Parse a `key value` / `key "quoted value"` option line, stripping quotes
fn parse_option_line(line: &str) -> Option<(String, String)> {
    let (key, raw) = line.split_once(' ')?;
    let value = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);
    Some((key.to_string(), value.to_string()))
}

/// Option cache: one idempotent bulk load per lifetime, read-through misses.
///
/// Misses on prefixed keys fall back to a direct single-key fetch and are
/// deliberately never written back into the bulk cache; the bulk cache is
/// populated exactly once.
pub struct OptionCache<S: OptionSource> {
    source: S,
    values: KvCache,
    loaded: bool,
}

impl<S: OptionSource> OptionCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            values: KvCache::new(),
            loaded: false,
        }
    }

    /// Look up an option, falling back to `default` when the source has no
    /// value. Keys outside the recognized prefix always take the direct
    /// fetch path and never trigger the bulk load.
    pub fn get(&mut self, key: &str, default: &str) -> String {
        self.lookup(key, default).0
    }

    /// As `get`, recording the hit/miss as a cache telemetry event
    pub fn get_tracked(&mut self, key: &str, default: &str, telemetry: &dyn Telemetry) -> String {
        let (value, hit) = self.lookup(key, default);
        telemetry.record_cache(EVENT_CACHE_GET, key, hit);
        value
    }

    fn lookup(&mut self, key: &str, default: &str) -> (String, bool) {
        if key.starts_with(OPTION_PREFIX) {
            self.ensure_loaded();
            if let Some(value) = self.values.get(key) {
                return (value.to_string(), true);
            }
        }

        let value = match self.source.fetch(key) {
            Some(value) if !value.is_empty() => value,
            _ => default.to_string(),
        };
        (value, false)
    }

    /// Number of bulk-cached entries (0 before first prefixed lookup)
    pub fn cached_len(&self) -> usize {
        self.values.len()
    }

    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        for (key, value) in self.source.list_prefixed(OPTION_PREFIX) {
            self.values.set(&key, &value);
        }

        log::debug!("Option cache bulk-loaded {} entries", self.values.len());
    }
}

/// File modification-time cache, lazily filled per queried path.
///
/// `-1` means the file does not exist or is inaccessible.
#[derive(Debug, Default)]
pub struct MtimeCache {
    entries: IndexMap<PathBuf, i64>,
}

impl MtimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mtime(&mut self, path: &Path, use_cache: bool) -> i64 {
        if use_cache {
            if let Some(value) = self.entries.get(path) {
                return *value;
            }
        }

        let value = stat_mtime(path);

        if use_cache {
            self.entries.insert(path.to_path_buf(), value);
        }

        value
    }
}

fn stat_mtime(path: &Path) -> i64 {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(-1)
}
