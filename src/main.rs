use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

mod cache;
mod cli;
mod commands;
mod config;
mod contract;
mod plugin;
mod telemetry;
mod theme;

use cli::{Cli, Commands, TelemetryAction, ThemeAction};
use config::{Config, LogLevel};

/// Application log rotation threshold
const APP_LOG_MAX_BYTES: u64 = 1024 * 1024;

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickbar")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tickbar.log");

    // Rotate an oversized log to .old before opening; a failed rotation is
    // not fatal, logging just continues into the oversized file
    if let Ok(meta) = fs::metadata(&log_file) {
        if meta.len() > APP_LOG_MAX_BYTES {
            let rotated = log_dir.join("tickbar.log.old");
            if let Err(e) = fs::rename(&log_file, &rotated) {
                eprintln!("warning: log rotation failed: {}", e);
            }
        }
    }

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        // Let env_logger parse RUST_LOG
        builder.parse_default_env();
    } else {
        // Use log level from config
        builder.filter_level(match log_level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        });
    }

    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Validate { path, format } => commands::validate::run_one(&path, format, &config),
        Commands::ValidateAll { dir, format } => commands::validate::run_all(dir, format, &config),
        Commands::Run { plugin, cache_ttl, args } => commands::run::run(&plugin, &args, cache_ttl, &config),
        Commands::Option { key, default } => commands::option::run(&key, &default, &config),
        Commands::Telemetry { action } => match action {
            TelemetryAction::Summary { window, format } => commands::telemetry::summary(window, format, &config),
            TelemetryAction::Clear => commands::telemetry::clear(&config),
        },
        Commands::Theme { action } => match action {
            ThemeAction::Load { name, variant } => commands::theme::load(&name, variant.as_deref(), &config),
            ThemeAction::List => commands::theme::list(&config),
        },
        Commands::New { name, path } => commands::new::run(&name, path, &config),
        Commands::Doctor => commands::doctor::run(&config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with log level from config (or RUST_LOG env var)
    setup_logging(&config.log_level).context("Failed to setup logging")?;

    info!("Starting tickbar with config from: {:?}", cli.config);

    // Run the command
    run(cli, config)?;

    Ok(())
}
