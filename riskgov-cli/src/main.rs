//! RiskGov CLI — Terminal interface for the risk governance orchestrator.
//!
//! Runs input records through the reference evaluators and reports health,
//! evaluator statistics, and the effective configuration.

mod commands;

use clap::Parser;
use riskgov_core::ExecutionMode;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// RiskGov: multi-evaluator risk governance from the command line
#[derive(Parser, Debug)]
#[command(name = "riskgov", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (reads `.riskgov/config.toml` from here)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path (replaces the layered lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Evaluate one record and print the orchestration response as JSON
    Run {
        /// Path to a JSON record, or `-` for stdin
        input: String,

        /// Execution mode: sequential or concurrent (defaults to the configured mode)
        #[arg(short, long)]
        mode: Option<ExecutionMode>,

        /// Abort on the first evaluator failure instead of recording it
        #[arg(long)]
        fail_fast: bool,
    },
    /// Print orchestrator and evaluator health, optionally after running some records
    Health {
        /// JSON records to run first
        inputs: Vec<PathBuf>,
    },
    /// Print cumulative evaluator reports, optionally after running some records
    Reports {
        /// JSON records to run first
        inputs: Vec<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let log_dir = directories::ProjectDirs::from("dev", "riskgov", "riskgov")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "riskgov.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace, cli.config.as_deref()).await
}
