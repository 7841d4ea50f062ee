//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use anyhow::Context;
use riskgov_core::config::{load_config, load_config_file};
use riskgov_core::{ExecutionMode, GovernanceConfig, Orchestrator};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{info_span, warn};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            input,
            mode,
            fail_fast,
        } => {
            let config = effective_config(workspace, config_path)?;
            handle_run(&config, &input, mode, fail_fast).await
        }
        Commands::Health { inputs } => {
            let config = effective_config(workspace, config_path)?;
            let orchestrator = run_all(&config, &inputs).await?;
            print_json(&orchestrator.health_status())
        }
        Commands::Reports { inputs } => {
            let config = effective_config(workspace, config_path)?;
            let orchestrator = run_all(&config, &inputs).await?;
            print_json(&orchestrator.agent_reports())
        }
        Commands::Config { action } => handle_config(action, workspace, config_path),
    }
}

/// Load configuration from an explicit file, or from the layered sources.
fn effective_config(
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<GovernanceConfig> {
    let config = match config_path {
        Some(path) => load_config_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path.display(), e))?,
        None => load_config(Some(workspace), None)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?,
    };
    for warning in config.validate() {
        warn!("{}", warning);
    }
    Ok(config)
}

fn build_orchestrator(config: &GovernanceConfig) -> anyhow::Result<Orchestrator> {
    Ok(Orchestrator::from_config(config)?.with_span(info_span!("riskgov")))
}

async fn handle_run(
    config: &GovernanceConfig,
    input: &str,
    mode: Option<ExecutionMode>,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let record = read_record(input).await?;
    let orchestrator = build_orchestrator(config)?;
    let mode = mode.unwrap_or(config.orchestrator.mode);
    let continue_on_error = !fail_fast && config.orchestrator.continue_on_error;

    let response = orchestrator
        .run(&record, mode, continue_on_error)
        .await
        .context("Orchestration failed")?;
    print_json(&response)
}

/// Run every record through one orchestrator, logging failures instead of stopping.
async fn run_all(config: &GovernanceConfig, inputs: &[PathBuf]) -> anyhow::Result<Orchestrator> {
    let orchestrator = build_orchestrator(config)?;
    for path in inputs {
        let record = read_record(&path.to_string_lossy()).await?;
        if let Err(e) = orchestrator.run_with_defaults(&record).await {
            warn!(input = %path.display(), error = %e, "Record failed");
        }
    }
    Ok(orchestrator)
}

/// Read a JSON record from a file path, or from stdin when `input` is `-`.
async fn read_record(input: &str) -> anyhow::Result<Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read record from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input))?
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", input))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".riskgov");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = GovernanceConfig::default().to_toml()?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = effective_config(workspace, config_path)?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
