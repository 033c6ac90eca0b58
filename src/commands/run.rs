//! Sandboxed plugin execution command

use eyre::Result;
use std::fs;

use crate::cache::MtimeCache;
use crate::config::Config;
use crate::plugin::{self, sandbox::Sandbox};
use crate::telemetry::{self, EVENT_CACHE_GET, EVENT_CACHE_INVALIDATE, EVENT_CACHE_SET};

pub fn run(plugin_name: &str, args: &[String], cache_ttl: u64, config: &Config) -> Result<()> {
    let plugins_dir = Config::expand_path(&config.paths.plugins);
    let cache_dir = Config::expand_path(&config.paths.cache);
    let unit = plugin::resolve(&plugins_dir, plugin_name);
    let recorder = telemetry::init(config);

    // Output caching: a fresh-enough cached segment short-circuits execution
    let output_cache = cache_dir.join(format!("{}.cache", unit.name));
    if cache_ttl > 0 {
        let mut mtimes = MtimeCache::new();
        let cached_at = mtimes.mtime(&output_cache, true);
        let now = chrono::Utc::now().timestamp();

        if cached_at >= 0 && now - cached_at < cache_ttl as i64 {
            if let Ok(text) = fs::read_to_string(&output_cache) {
                recorder.record_cache(EVENT_CACHE_GET, &unit.name, true);
                let start = recorder.plugin_start();
                recorder.plugin_end(&unit.name, start, true);
                print!("{}", text);
                return Ok(());
            }
        } else if cached_at >= 0 {
            recorder.record_event(EVENT_CACHE_INVALIDATE, &unit.name, 0, "expired");
        }
        recorder.record_cache(EVENT_CACHE_GET, &unit.name, false);
    }

    let sandbox = Sandbox::new(cache_dir, config.sandbox.clone());

    let start = recorder.plugin_start();
    let outcome = sandbox.execute_safe(&unit, args);
    recorder.plugin_end(&unit.name, start, false);

    if cache_ttl > 0 && !outcome.failed() {
        if let Err(e) = fs::write(&output_cache, &outcome.stdout) {
            log::warn!("Failed to write output cache for '{}': {}", unit.name, e);
        } else {
            recorder.record_event(EVENT_CACHE_SET, &unit.name, 0, "");
        }
    }

    // Graceful degradation: stdout is emitted even when the plugin failed
    if !outcome.stdout.is_empty() {
        print!("{}", outcome.stdout);
    }

    // The plugin's exit status becomes our own
    if outcome.exit_code != 0 {
        std::process::exit(outcome.exit_code);
    }
    Ok(())
}
