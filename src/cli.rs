//! CLI surface: argument parsing and summary presentation only.
//! No orchestration here; the binary dispatches to the generation runner.

use crate::error::EngineError;
use crate::generation::RunSummary;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "cadence",
    version,
    about = "Recurring task materialization engine"
)]
pub struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Explicit configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Task store path (overrides configuration)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Log level override
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Suppress logging output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one generation pass for a processing date
    Run {
        /// Processing date (YYYY-MM-DD, defaults to today UTC)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Restrict the pass to one workspace id
        #[arg(long)]
        workspace_id: Option<String>,

        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one task record as JSON
    Inspect {
        /// Task id to look up
        task_id: String,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", s, e))
}

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &EngineError) -> String {
    e.to_string()
}

pub fn format_summary_table(summary: &RunSummary) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "processing date",
        "candidates",
        "generated",
        "not due",
        "already generated",
        "errored",
    ]);
    table.add_row(vec![
        summary.processing_date.to_string(),
        summary.candidates.to_string(),
        summary.generated.to_string(),
        summary.skipped_not_due.to_string(),
        summary.skipped_existing.to_string(),
        summary.errored().to_string(),
    ]);

    let status = if summary.succeeded() {
        "ok".green().to_string()
    } else {
        "failed".red().to_string()
    };

    let mut out = format!("Generation pass: {}\n{}", status, table);
    for failure in &summary.failures {
        out.push_str(&format!(
            "\n{} {}: {}",
            "error".red(),
            failure.task_id,
            failure.message
        ));
    }
    if let Some(err) = &summary.insert_error {
        out.push_str(&format!("\n{} bulk insert: {}", "error".red(), err));
    }
    out
}

pub fn format_summary_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
