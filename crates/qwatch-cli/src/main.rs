//! qwatch CLI - Claude Code quota monitor
//!
//! A command-line interface for checking subscription quota usage, browsing
//! the recorded usage history and watching quota live.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use qwatch_core::config::{expand_path, QuotaWatchConfig};
use qwatch_core::GraphWindow;

#[derive(Parser)]
#[command(name = "qwatch")]
#[command(author, version, about = "Claude Code quota monitor", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Override credentials file (or set QWATCH_CREDENTIALS_PATH env var)
    #[arg(long, env = "QWATCH_CREDENTIALS_PATH", global = true)]
    credentials: Option<String>,

    /// Override history file (or set QWATCH_HISTORY_PATH env var)
    #[arg(long, env = "QWATCH_HISTORY_PATH", global = true)]
    history: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch current quota usage once
    Status,

    /// Show usage statistics from the recorded history
    History {
        /// Graph window: 30m, 5h or 24h
        #[arg(long, short, default_value = "24h")]
        window: GraphWindow,
    },

    /// Poll quota continuously until Ctrl-C
    Watch,

    /// Show local token statistics
    Tokens,

    /// Show the effective configuration
    Config,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = QuotaWatchConfig::from_env()?;
    if let Some(path) = &cli.credentials {
        config.credentials_path = expand_path(path);
    }
    if let Some(path) = &cli.history {
        config.history_path = expand_path(path);
    }
    log::debug!("[cli] Effective config: {:?}", config);

    // Create context for commands
    let ctx = commands::Context {
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Status => commands::status::execute(&ctx).await,
        Commands::History { window } => commands::history::execute(&ctx, window).await,
        Commands::Watch => commands::watch::execute(&ctx).await,
        Commands::Tokens => commands::tokens::execute(&ctx).await,
        Commands::Config => commands::config::execute(&ctx).await,
    }
}
