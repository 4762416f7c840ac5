//! toolpilot CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive chat or single-message mode
//! - `tools`   — List the tools the model can call
//! - `memory`  — Inspect or clear the conversation store
//! - `config`  — Show or initialize configuration
//! - `doctor`  — Diagnose Ollama, search, and store setup

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(
    name = "toolpilot",
    about = "toolpilot — a local Ollama assistant that can search the web and manage files",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.toolpilot/config.toml
    #[arg(short, long, global = true, env = "TOOLPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List the available tools
    Tools,

    /// Conversation memory commands
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose system health
    Doctor,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show store location and record count
    Stats,

    /// Find past exchanges similar to a query
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Delete every stored exchange
    Clear {
        /// Required to actually delete
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file path
    Path,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(toolpilot_config::AppConfig::config_path);

    // These work even when the config file is broken.
    match &cli.command {
        Commands::Config {
            action: ConfigAction::Init { force },
        } => {
            init_tracing(cli.verbose);
            return commands::config_cmd::init(&config_path, *force);
        }
        Commands::Config {
            action: ConfigAction::Path,
        } => {
            println!("{}", config_path.display());
            return Ok(());
        }
        _ => {}
    }

    let config = commands::load_config(&config_path)?;
    init_tracing(cli.verbose || config.debug);

    match cli.command {
        Commands::Chat { message } => commands::chat::run(&config, message).await?,
        Commands::Tools => commands::tools::run(&config)?,
        Commands::Memory { action } => match action {
            MemoryAction::Stats => commands::memory::stats(&config).await?,
            MemoryAction::Search { query, limit } => {
                commands::memory::search(&config, &query, limit).await?
            }
            MemoryAction::Clear { confirm } => commands::memory::clear(&config, confirm).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config, &config_path),
            ConfigAction::Init { .. } | ConfigAction::Path => {}
        },
        Commands::Doctor => commands::doctor::run(&config, &config_path).await?,
    }

    Ok(())
}
