//! Theme palette commands

use colored::*;
use eyre::Result;

use crate::config::Config;
use crate::theme::ThemeCache;

pub fn load(name: &str, variant: Option<&str>, config: &Config) -> Result<()> {
    let mut cache = ThemeCache::new(Config::expand_path(&config.paths.themes));
    cache.load(name, variant)?;

    println!(
        "Theme: {}\n",
        cache.loaded_theme().unwrap_or("default").cyan().bold()
    );
    for (key, color) in cache.colors() {
        println!("  {:<14} {}", key, color.bold());
    }

    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let cache = ThemeCache::new(Config::expand_path(&config.paths.themes));
    let themes = cache.available();

    if themes.is_empty() {
        println!("{} No themes found", "⚠".yellow());
        return Ok(());
    }

    println!("{}:", "Available themes".bold());
    for name in themes {
        println!("  {}", name);
    }

    Ok(())
}
