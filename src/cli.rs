use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "tickbar",
    about = "Plugin contract and execution runtime for tmux status bars",
    version,
    after_help = "Logs are written to: ~/.local/share/tickbar/logs/tickbar.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to tickbar.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a plugin against the contract
    Validate {
        /// Path to a plugin script
        path: PathBuf,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Validate every plugin in a directory
    ValidateAll {
        /// Plugin directory (defaults to the configured plugins path)
        dir: Option<PathBuf>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Execute a plugin in the sandbox
    Run {
        /// Plugin name or path
        plugin: String,

        /// Serve cached output younger than this many seconds (0 disables)
        #[arg(long, default_value = "0")]
        cache_ttl: u64,

        /// Arguments forwarded to the plugin
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },

    /// Look up a configuration option with a default fallback
    Option {
        /// Option key (e.g. @tickbar_theme)
        key: String,

        /// Value returned when the option is unset
        #[arg(default_value = "")]
        default: String,
    },

    /// Query and manage execution telemetry
    Telemetry {
        #[command(subcommand)]
        action: TelemetryAction,
    },

    /// Manage theme palettes
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Scaffold a new conforming plugin
    New {
        /// Plugin name
        name: String,

        /// Output directory (defaults to the configured plugins path)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Diagnose setup issues
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum TelemetryAction {
    /// Show rolling aggregates over the telemetry log
    Summary {
        /// Window in hours
        #[arg(long, default_value = "24")]
        window: u64,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Delete the telemetry log and its rotation backup
    Clear,
}

#[derive(Subcommand)]
pub enum ThemeAction {
    /// Load a palette and print the resolved colors
    Load {
        /// Theme name
        name: String,

        /// Theme variant
        #[arg(long)]
        variant: Option<String>,
    },

    /// List available themes
    List,
}
