//! Contract validation commands

use eyre::Result;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::contract::Contract;
use crate::contract::validator::{self, print_batch_summary, print_report};

pub fn run_one(path: &Path, format: Option<OutputFormat>, _config: &Config) -> Result<()> {
    let contract = Contract::standard();
    let report = validator::validate(&contract, path)?;

    match OutputFormat::resolve(format) {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_valid() {
        eyre::bail!("Plugin '{}' failed validation", report.plugin_name);
    }
    Ok(())
}

pub fn run_all(dir: Option<PathBuf>, format: Option<OutputFormat>, config: &Config) -> Result<()> {
    let dir = dir.unwrap_or_else(|| Config::expand_path(&config.paths.plugins));
    let contract = Contract::standard();
    let summary = validator::validate_all(&contract, &dir)?;

    match OutputFormat::resolve(format) {
        OutputFormat::Text => print_batch_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if !summary.all_valid() {
        eyre::bail!("{} of {} plugins failed validation", summary.invalid, summary.total);
    }
    Ok(())
}
