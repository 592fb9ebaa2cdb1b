use crate::task::TaskId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One template that could not be processed during a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFailure {
    pub task_id: TaskId,
    pub message: String,
}

/// Result of one generation pass, suitable for logging or alerting.
///
/// `candidates` counts every template the pass looked at; each of them lands
/// in exactly one of `generated`, `skipped_not_due`, `skipped_existing` or
/// `failures`. A bulk-insert failure is recorded on `insert_error` without
/// discarding the per-template accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub processing_date: NaiveDate,
    pub candidates: usize,
    pub generated: usize,
    pub skipped_not_due: usize,
    pub skipped_existing: usize,
    pub failures: Vec<TemplateFailure>,
    pub insert_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        self.insert_error.is_none()
    }

    pub fn errored(&self) -> usize {
        self.failures.len()
    }
}
