//! CLI interface and argument parsing

pub mod commands;

use clap::{Parser, Subcommand};

/// Eventvault - business event archive exporter
#[derive(Parser, Debug)]
#[command(name = "eventvault")]
#[command(version, about, long_about = None)]
#[command(author = "Eventvault Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "eventvault.toml", env = "EVENTVAULT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "EVENTVAULT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export event windows for every configured integration
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show checkpoint positions and recent archives
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
