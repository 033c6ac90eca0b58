//! Plugin execution telemetry
//!
//! Recording is a strategy object chosen once at startup: when telemetry is
//! disabled every operation is a true no-op, otherwise events go to an
//! append-only pipe-delimited log. Telemetry failures are downgraded to log
//! warnings; they can never break the render path.

use eyre::Result;
use serde::Serialize;
use std::time::Instant;

mod file;

pub use file::FileTelemetry;

use crate::config::Config;

pub const EVENT_PLUGIN_EXEC: &str = "plugin_exec";
pub const EVENT_CACHE_HIT: &str = "cache_hit";
pub const EVENT_CACHE_GET: &str = "cache_get";
pub const EVENT_CACHE_SET: &str = "cache_set";
pub const EVENT_CACHE_INVALIDATE: &str = "cache_invalidate";

/// Rolling aggregates over the telemetry log
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySummary {
    pub enabled: bool,
    pub event_count: usize,
    pub avg_duration_ms: f64,
    pub slow_count: usize,
    pub cache_hit_rate_percent: f64,
}

/// Telemetry recording strategy
pub trait Telemetry {
    /// Append one event to the telemetry log
    fn record_event(&self, kind: &str, source: &str, duration_ms: u64, extra: &str);

    /// Start timing a plugin execution
    fn plugin_start(&self) -> Instant {
        Instant::now()
    }

    /// Finish timing a plugin execution and record it
    fn plugin_end(&self, source: &str, start: Instant, cache_hit: bool);

    /// Record a cache operation; gated by its own opt-in flag
    fn record_cache(&self, operation: &str, key: &str, hit: bool);

    /// Aggregates over events within the last `window_hours`
    fn summary(&self, window_hours: u64) -> Result<TelemetrySummary>;

    /// Delete the telemetry log and its rotation backup
    fn clear(&self) -> Result<()>;
}

/// Inert strategy bound when telemetry is disabled
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record_event(&self, _kind: &str, _source: &str, _duration_ms: u64, _extra: &str) {}

    fn plugin_end(&self, _source: &str, _start: Instant, _cache_hit: bool) {}

    fn record_cache(&self, _operation: &str, _key: &str, _hit: bool) {}

    fn summary(&self, _window_hours: u64) -> Result<TelemetrySummary> {
        // The one observable disabled behavior: an explicit indicator
        Ok(TelemetrySummary::default())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Select the recording strategy once, for the process lifetime
pub fn init(config: &Config) -> Box<dyn Telemetry> {
    if config.telemetry.enabled {
        Box::new(FileTelemetry::new(
            config.telemetry_log(),
            config.telemetry.max_log_bytes,
            config.telemetry.slow_threshold_ms,
            config.telemetry.track_cache_hits,
        ))
    } else {
        Box::new(NoopTelemetry)
    }
}
