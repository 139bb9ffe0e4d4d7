mod backup;
mod cli;
mod config;
mod db;
mod embedding;
mod engine;
mod response;
mod server;
mod summarizer;
mod tools;
mod vector;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engram", version, about = "Persistent memory MCP server for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport by default)
    Serve,
    /// Initialize the memory stores
    Init {
        /// Wipe and recreate both stores
        #[arg(long)]
        reset: bool,
    },
    /// Manage snapshots of the data directory
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
    /// Restore the data directory from a snapshot
    Restore {
        /// Path to the snapshot archive
        file: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Report drift between the relational and vector stores
    Doctor,
}

#[derive(Subcommand)]
enum BackupAction {
    /// Create a snapshot now, regardless of the interval
    Create,
    /// List available snapshots, newest first
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::EngramConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let transport = config.server.transport.clone();
    match cli.command {
        Command::Serve => match transport.as_str() {
            "http" => server::serve_http(config).await?,
            _ => server::serve_stdio(config).await?,
        },
        Command::Init { reset } => {
            cli::init(&config, reset)?;
        }
        Command::Backup { action } => match action {
            BackupAction::Create => cli::backup::create(&config)?,
            BackupAction::List => cli::backup::list(&config),
        },
        Command::Restore { file, yes } => {
            cli::restore::run(&config, &file, yes)?;
        }
        Command::Doctor => {
            cli::doctor(&config)?;
        }
    }

    Ok(())
}
