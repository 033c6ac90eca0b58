//! File-backed telemetry recording
//!
//! Log lines are pipe-delimited: `timestamp|kind|source|duration_ms|extra`.
//! The log rotates to a `.old` suffix (overwriting any prior rotation) when
//! it crosses the configured size, at most once per append.

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use super::{EVENT_CACHE_GET, EVENT_CACHE_HIT, EVENT_PLUGIN_EXEC, Telemetry, TelemetrySummary};

pub struct FileTelemetry {
    log_path: PathBuf,
    max_log_bytes: u64,
    slow_threshold_ms: u64,
    track_cache_hits: bool,
}

impl FileTelemetry {
    pub fn new(log_path: PathBuf, max_log_bytes: u64, slow_threshold_ms: u64, track_cache_hits: bool) -> Self {
        Self {
            log_path,
            max_log_bytes,
            slow_threshold_ms,
            track_cache_hits,
        }
    }

    fn rotated_path(&self) -> PathBuf {
        let mut s = self.log_path.clone().into_os_string();
        s.push(".old");
        PathBuf::from(s)
    }

    fn rotate_if_needed(&self) {
        let size = match fs::metadata(&self.log_path) {
            Ok(meta) => meta.len(),
            Err(_) => return,
        };

        if size <= self.max_log_bytes {
            return;
        }

        // Single-step rotation; a failed rename is non-fatal
        if let Err(e) = fs::rename(&self.log_path, self.rotated_path()) {
            log::warn!("Telemetry log rotation failed: {}", e);
        }
    }

    fn append_line(&self, kind: &str, source: &str, duration_ms: u64, extra: &str) -> std::io::Result<()> {
        self.rotate_if_needed();

        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.log_path)?;
        writeln!(
            file,
            "{}|{}|{}|{}|{}",
            Utc::now().to_rfc3339(),
            kind,
            source,
            duration_ms,
            extra
        )
    }
}

impl Telemetry for FileTelemetry {
    fn record_event(&self, kind: &str, source: &str, duration_ms: u64, extra: &str) {
        if let Err(e) = self.append_line(kind, source, duration_ms, extra) {
            log::warn!("Failed to record telemetry event: {}", e);
        }
    }

    fn plugin_end(&self, source: &str, start: Instant, cache_hit: bool) {
        let duration_ms = start.elapsed().as_millis() as u64;

        if duration_ms >= self.slow_threshold_ms {
            log::warn!("Slow plugin execution: {} took {}ms", source, duration_ms);
        }

        let kind = if cache_hit { EVENT_CACHE_HIT } else { EVENT_PLUGIN_EXEC };
        self.record_event(kind, source, duration_ms, "");
    }

    fn record_cache(&self, operation: &str, key: &str, hit: bool) {
        if !self.track_cache_hits {
            return;
        }
        self.record_event(operation, key, 0, if hit { "hit" } else { "miss" });
    }

    fn summary(&self, window_hours: u64) -> Result<TelemetrySummary> {
        let mut summary = TelemetrySummary {
            enabled: true,
            ..Default::default()
        };

        let content = match fs::read_to_string(&self.log_path) {
            Ok(content) => content,
            Err(_) => return Ok(summary),
        };

        // A window too large to represent degrades to a whole-log scan
        let cutoff = i64::try_from(window_hours)
            .ok()
            .and_then(Duration::try_hours)
            .and_then(|window| Utc::now().checked_sub_signed(window));

        let mut duration_sum: u64 = 0;
        let mut cache_hits: usize = 0;
        let mut cache_misses: usize = 0;

        // Full linear scan; events outside the window (or with unparseable
        // timestamps) are excluded from every aggregate.
        for line in content.lines() {
            let mut fields = line.splitn(5, '|');
            let (Some(ts), Some(kind), Some(_source), Some(duration), Some(extra)) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                continue;
            };

            let Ok(timestamp) = DateTime::parse_from_rfc3339(ts) else {
                continue;
            };
            if let Some(cutoff) = cutoff {
                if timestamp.with_timezone(&Utc) < cutoff {
                    continue;
                }
            }

            let duration_ms: u64 = duration.parse().unwrap_or(0);

            summary.event_count += 1;
            duration_sum += duration_ms;

            if (kind == EVENT_PLUGIN_EXEC || kind == EVENT_CACHE_HIT) && duration_ms >= self.slow_threshold_ms {
                summary.slow_count += 1;
            }

            // The hit rate covers lookups only; cache writes, invalidations
            // and the served-from-cache execution kind are not lookups (a
            // cached execution already recorded its own lookup hit).
            if kind == EVENT_CACHE_GET {
                if extra == "hit" {
                    cache_hits += 1;
                } else if extra == "miss" {
                    cache_misses += 1;
                }
            }
        }

        if summary.event_count > 0 {
            summary.avg_duration_ms = duration_sum as f64 / summary.event_count as f64;
        }

        let cache_total = cache_hits + cache_misses;
        if cache_total > 0 {
            summary.cache_hit_rate_percent = cache_hits as f64 / cache_total as f64 * 100.0;
        }

        Ok(summary)
    }

    fn clear(&self) -> Result<()> {
        let rotated = self.rotated_path();
        for path in [&self.log_path, &rotated] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
        Ok(())
    }
}
