//! Scaffold a conforming plugin script

use colored::*;
use eyre::Result;
use lazy_regex::regex_is_match;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::plugin::UNIT_EXTENSION;

const TEMPLATE: &str = r#"#!/usr/bin/env bash
# {name} - tickbar plugin

plugin_render() {
    echo "{name}"
}

plugin_interval() {
    echo 5
}

plugin_options() {
    echo "@tickbar_{name}_enabled"
}

plugin_health() {
    echo "good"
}
"#;

pub fn run(name: &str, path: Option<PathBuf>, config: &Config) -> Result<()> {
    if !regex_is_match!(r"^[a-z][a-z0-9_-]*$", name) {
        eyre::bail!("Invalid plugin name '{}' (lowercase letters, digits, - and _)", name);
    }

    let dir = path.unwrap_or_else(|| Config::expand_path(&config.paths.plugins));
    fs::create_dir_all(&dir)?;

    let script = dir.join(format!("{}.{}", name, UNIT_EXTENSION));
    if script.exists() {
        eyre::bail!("Plugin already exists: {}", script.display());
    }

    fs::write(&script, TEMPLATE.replace("{name}", name))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&script)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms)?;
    }

    println!("{} Created plugin: {}", "✓".green(), script.display());
    println!("  Validate it with {}", format!("tickbar validate {}", script.display()).cyan());
    Ok(())
}
