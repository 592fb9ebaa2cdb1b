//! Cadence CLI Binary
//!
//! Command-line entry point for the recurring task materialization engine.
//! Scheduling stays external: any periodic trigger (cron, timer unit) that
//! invokes `cadence run` once per processing date is sufficient.

use anyhow::Context;
use cadence::cli::{self, Cli, Commands};
use cadence::config::{CadenceConfig, ConfigLoader};
use cadence::generation::GenerationRunner;
use cadence::logging::{init_logging, LoggingConfig};
use cadence::store::{SledTaskStore, TaskStore, TemplateFilter};
use cadence::task::TaskId;
use chrono::Utc;
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("cadence starting");

    match execute(&cli, &config) {
        Ok((output, code)) => {
            println!("{}", output);
            if code != 0 {
                process::exit(code);
            }
        }
        Err(e) => {
            error!("command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn execute(cli: &Cli, config: &CadenceConfig) -> anyhow::Result<(String, i32)> {
    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| config.storage.path.clone());
    let store = SledTaskStore::new(&store_path)
        .with_context(|| format!("opening task store at {}", store_path.display()))?;
    let store: Arc<dyn TaskStore> = Arc::new(store);

    let rt = tokio::runtime::Runtime::new().context("creating async runtime")?;

    match &cli.command {
        Commands::Run {
            date,
            workspace_id,
            json,
        } => {
            let processing_date = date.unwrap_or_else(|| Utc::now().date_naive());
            let mut filter = TemplateFilter::for_date(processing_date);
            if let Some(workspace) = workspace_id {
                filter = filter.with_workspace(workspace.clone());
            }

            let runner =
                GenerationRunner::new(store).with_fail_fast(config.generation.fail_fast);
            let summary = rt
                .block_on(runner.run_filtered(&filter))
                .map_err(|e| anyhow::anyhow!(cli::map_error(&e)))?;

            let output = if *json {
                cli::format_summary_json(&summary).context("encoding run summary")?
            } else {
                cli::format_summary_table(&summary)
            };
            let code = if summary.succeeded() { 0 } else { 2 };
            Ok((output, code))
        }
        Commands::Inspect { task_id } => {
            let record = rt
                .block_on(store.get(&TaskId::new(task_id.clone())))
                .context("reading task record")?;
            match record {
                Some(record) => {
                    let json =
                        serde_json::to_string_pretty(&record).context("encoding task record")?;
                    Ok((json, 0))
                }
                None => anyhow::bail!("task {} not found", task_id),
            }
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CadenceConfig> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => ConfigLoader::load(&cli.workspace).context("loading workspace configuration"),
    }
}

/// Build logging configuration from CLI flags over the config file.
fn build_logging_config(cli: &Cli, config: &CadenceConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.quiet {
        logging.level = "off".to_string();
    }
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    logging
}
