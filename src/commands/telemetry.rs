//! Telemetry query commands

use colored::*;
use eyre::Result;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::telemetry;

pub fn summary(window: u64, format: Option<OutputFormat>, config: &Config) -> Result<()> {
    let recorder = telemetry::init(config);
    let summary = recorder.summary(window)?;

    match OutputFormat::resolve(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            if !summary.enabled {
                println!("{}", "telemetry disabled".yellow());
                return Ok(());
            }

            println!("{} (last {}h)\n", "Telemetry Summary".cyan().bold(), window);
            println!("  events:          {}", summary.event_count);
            println!("  avg duration:    {:.1}ms", summary.avg_duration_ms);
            println!(
                "  slow executions: {}",
                if summary.slow_count > 0 {
                    summary.slow_count.to_string().yellow()
                } else {
                    summary.slow_count.to_string().normal()
                }
            );
            println!("  cache hit rate:  {:.1}%", summary.cache_hit_rate_percent);
        }
    }

    Ok(())
}

pub fn clear(config: &Config) -> Result<()> {
    let recorder = telemetry::init(config);
    recorder.clear()?;
    println!("{} Telemetry log cleared", "✓".green());
    Ok(())
}
