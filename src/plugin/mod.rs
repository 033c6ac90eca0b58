//! Plugin unit discovery and management
//!
//! A plugin unit is a shell script on disk. Units are discovered at
//! validation/execution time and carry no state of their own; everything the
//! runtime remembers about a unit lives in the caches, keyed by its name.

use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub mod sandbox;

/// Script extension recognized as a plugin unit
pub const UNIT_EXTENSION: &str = "sh";

/// A plugin unit, identified by its path
#[derive(Debug, Clone)]
pub struct PluginUnit {
    pub path: PathBuf,
    pub name: String,
}

impl PluginUnit {
    /// Create a unit from a path; the name is the basename without the
    /// script extension.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self { path, name }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Discover all plugin units in a directory, in stable lexical order
pub fn discover(dir: &Path) -> Result<Vec<PluginUnit>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut units = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read plugins directory: {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(UNIT_EXTENSION) => units.push(PluginUnit::new(path)),
            _ => {
                log::debug!("Skipping non-plugin file: {}", path.display());
            }
        }
    }

    units.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(units)
}

/// Resolve a plugin by name or path.
///
/// A name containing a path separator (or naming an existing file) is taken
/// as a direct path; otherwise `<plugins_dir>/<name>.sh` is assumed.
pub fn resolve(plugins_dir: &Path, name_or_path: &str) -> PluginUnit {
    let direct = PathBuf::from(name_or_path);
    if direct.is_file() || name_or_path.contains(std::path::MAIN_SEPARATOR) {
        return PluginUnit::new(direct);
    }
    PluginUnit::new(plugins_dir.join(format!("{}.{}", name_or_path, UNIT_EXTENSION)))
}
