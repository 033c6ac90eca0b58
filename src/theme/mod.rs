//! Theme palette loading
//!
//! Resolves a named palette (with variant and fallback chain) into a
//! key-to-color mapping. Palette data is opaque to the runtime; renderers
//! decide what the keys mean.

#![allow(dead_code)] // color lookup is consumed by renderers

use eyre::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::KvCache;

/// Colors used when no palette file resolves
const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("foreground", "#c0caf5"),
    ("background", "#1a1b26"),
    ("accent", "#7aa2f7"),
    ("warn", "#e0af68"),
    ("crit", "#f7768e"),
];

#[derive(Debug, Default, Deserialize)]
struct PaletteFile {
    #[serde(default)]
    colors: IndexMap<String, String>,
}

/// Cache-backed color mapping for the active theme
pub struct ThemeCache {
    themes_dir: PathBuf,
    colors: KvCache,
    loaded: Option<String>,
}

impl ThemeCache {
    pub fn new(themes_dir: PathBuf) -> Self {
        Self {
            themes_dir,
            colors: KvCache::new(),
            loaded: None,
        }
    }

    /// Load a palette by name and optional variant.
    ///
    /// Fallback chain: `<name>-<variant>.yaml`, then `<name>.yaml`, then the
    /// built-in default palette. A present-but-unparseable file is an error,
    /// not a fallback.
    pub fn load(&mut self, name: &str, variant: Option<&str>) -> Result<()> {
        self.colors.clear();

        let mut candidates = Vec::new();
        if let Some(variant) = variant {
            candidates.push(self.themes_dir.join(format!("{}-{}.yaml", name, variant)));
        }
        candidates.push(self.themes_dir.join(format!("{}.yaml", name)));

        for path in &candidates {
            if !path.is_file() {
                continue;
            }

            let palette = read_palette(path)?;
            for (key, value) in &palette.colors {
                self.colors.set(key, value);
            }
            self.loaded = Some(name.to_string());
            log::info!("Loaded theme '{}' from {}", name, path.display());
            return Ok(());
        }

        for (key, value) in DEFAULT_PALETTE {
            self.colors.set(key, value);
        }
        self.loaded = Some("default".to_string());
        log::info!("Theme '{}' not found, using built-in default palette", name);
        Ok(())
    }

    /// Resolve a color key, falling back to the supplied default
    pub fn color(&self, key: &str, default: &str) -> String {
        self.colors.get(key).unwrap_or(default).to_string()
    }

    pub fn loaded_theme(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    pub fn colors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors.iter()
    }

    /// Theme names available on disk, recursively
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(&self.themes_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("yaml"))
            .filter_map(|e| e.path().file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        names.sort();
        names
    }
}

fn read_palette(path: &Path) -> Result<PaletteFile> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read theme file: {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse theme file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_theme(dir: &Path, file: &str, yaml: &str) {
        fs::write(dir.join(file), yaml).unwrap();
    }

    #[test]
    fn test_load_exact_variant() {
        let temp = tempdir().unwrap();
        write_theme(temp.path(), "tokyo-night.yaml", "colors:\n  accent: '#1111ff'\n");
        write_theme(temp.path(), "tokyo.yaml", "colors:\n  accent: '#2222ff'\n");

        let mut cache = ThemeCache::new(temp.path().to_path_buf());
        cache.load("tokyo", Some("night")).unwrap();
        assert_eq!(cache.color("accent", "x"), "#1111ff");
        assert_eq!(cache.loaded_theme(), Some("tokyo"));
    }

    #[test]
    fn test_variant_falls_back_to_base() {
        let temp = tempdir().unwrap();
        write_theme(temp.path(), "tokyo.yaml", "colors:\n  accent: '#2222ff'\n");

        let mut cache = ThemeCache::new(temp.path().to_path_buf());
        cache.load("tokyo", Some("storm")).unwrap();
        assert_eq!(cache.color("accent", "x"), "#2222ff");
    }

    #[test]
    fn test_unknown_theme_falls_back_to_builtin() {
        let temp = tempdir().unwrap();

        let mut cache = ThemeCache::new(temp.path().to_path_buf());
        cache.load("nope", None).unwrap();
        assert_eq!(cache.loaded_theme(), Some("default"));
        assert_eq!(cache.color("accent", "x"), "#7aa2f7");
    }

    #[test]
    fn test_unparseable_theme_is_error() {
        let temp = tempdir().unwrap();
        write_theme(temp.path(), "broken.yaml", "colors: [not, a, map\n");

        let mut cache = ThemeCache::new(temp.path().to_path_buf());
        assert!(cache.load("broken", None).is_err());
    }

    #[test]
    fn test_color_default_for_unknown_key() {
        let temp = tempdir().unwrap();
        let mut cache = ThemeCache::new(temp.path().to_path_buf());
        cache.load("nope", None).unwrap();
        assert_eq!(cache.color("nonexistent", "#fff"), "#fff");
    }

    #[test]
    fn test_available_lists_sorted_stems() {
        let temp = tempdir().unwrap();
        write_theme(temp.path(), "b.yaml", "colors: {}\n");
        write_theme(temp.path(), "a.yaml", "colors: {}\n");

        let cache = ThemeCache::new(temp.path().to_path_buf());
        assert_eq!(cache.available(), vec!["a".to_string(), "b".to_string()]);
    }
}
