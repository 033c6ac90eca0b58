//! Diagnose tickbar setup issues

use colored::*;
use eyre::Result;
use std::fs;

use crate::config::Config;
use crate::plugin;

pub fn run(config: &Config) -> Result<()> {
    println!("{}", "Tickbar Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    // Check tickbar directory
    let tickbar_dir = Config::tickbar_dir();
    if tickbar_dir.exists() {
        println!("{} Tickbar directory: {}", "✓".green(), tickbar_dir.display());
    } else {
        println!("{} Tickbar directory missing: {}", "✗".red(), tickbar_dir.display());
        issues += 1;
    }

    // Check plugins directory
    let plugins_dir = Config::expand_path(&config.paths.plugins);
    if plugins_dir.exists() {
        let count = plugin::discover(&plugins_dir).map(|units| units.len()).unwrap_or(0);
        println!(
            "{} Plugins directory: {} ({} plugins)",
            "✓".green(),
            plugins_dir.display(),
            count
        );
    } else {
        println!("{} Plugins directory missing: {}", "⚠".yellow(), plugins_dir.display());
    }

    // Check themes directory
    let themes_dir = Config::expand_path(&config.paths.themes);
    if themes_dir.exists() {
        println!("{} Themes directory: {}", "✓".green(), themes_dir.display());
    } else {
        println!("{} Themes directory missing: {}", "⚠".yellow(), themes_dir.display());
    }

    // Check cache directory is writable
    let cache_dir = Config::expand_path(&config.paths.cache);
    match check_writable(&cache_dir) {
        Ok(()) => println!("{} Cache directory writable: {}", "✓".green(), cache_dir.display()),
        Err(e) => {
            println!("{} Cache directory not writable: {} ({})", "✗".red(), cache_dir.display(), e);
            issues += 1;
        }
    }

    println!();

    // Check telemetry state
    println!("{}", "Telemetry:".bold());
    if config.telemetry.enabled {
        let log = config.telemetry_log();
        let size = fs::metadata(&log).map(|m| m.len()).unwrap_or(0);
        println!("  {} enabled, log: {} ({} bytes)", "✓".green(), log.display(), size);
    } else {
        println!("  {} disabled", "⚠".yellow());
    }

    println!();

    // Check dependencies
    println!("{}", "Dependencies:".bold());

    if which::which(&config.sandbox.interpreter).is_ok() {
        println!("  {} {} (plugin interpreter)", "✓".green(), config.sandbox.interpreter);
    } else {
        println!(
            "  {} {} (required to run non-executable plugins)",
            "✗".red(),
            config.sandbox.interpreter
        );
        issues += 1;
    }

    if which::which("tmux").is_ok() {
        println!("  {} tmux", "✓".green());
    } else {
        println!("  {} tmux (required for live option lookups)", "⚠".yellow());
    }

    println!();
    if issues == 0 {
        println!("{} No issues found", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "✗".red().bold(), issues);
    }

    Ok(())
}

fn check_writable(dir: &std::path::Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let probe = dir.join(".doctor-probe");
    fs::write(&probe, "ok")?;
    fs::remove_file(&probe)
}
