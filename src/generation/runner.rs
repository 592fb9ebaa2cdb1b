//! Generation runner: one batch pass over the Task Store.
//!
//! Fetch candidates, evaluate each independently, guard against duplicate
//! generation, stage instances, bulk-insert once, return a summary. The pass
//! carries no state between runs beyond what the store persists, so re-running
//! for the same date is a no-op.

use crate::error::EngineError;
use crate::generation::summary::{RunSummary, TemplateFailure};
use crate::recurrence::{compute_due_date, should_fire, DueDateOutcome};
use crate::store::{TaskStore, TemplateFilter};
use crate::task::{TaskRecord, TemplateTask};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Terminal disposition of one candidate within a pass.
enum Disposition {
    Stage(TaskRecord),
    NotDue,
    AlreadyGenerated,
}

pub struct GenerationRunner {
    store: Arc<dyn TaskStore>,
    fail_fast: bool,
}

impl GenerationRunner {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            fail_fast: false,
        }
    }

    /// Escalate per-template storage failures (existence checks) into a fatal
    /// run error instead of skipping the template. Default off: a single
    /// failing read should not abort the batch.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run one pass for the given processing date across all workspaces.
    pub async fn run(&self, processing_date: NaiveDate) -> Result<RunSummary, EngineError> {
        self.run_filtered(&TemplateFilter::for_date(processing_date))
            .await
    }

    /// Run one pass with an explicit candidate filter (e.g. scoped to one
    /// workspace). A candidate-fetch failure is fatal: nothing can proceed
    /// without candidates.
    pub async fn run_filtered(&self, filter: &TemplateFilter) -> Result<RunSummary, EngineError> {
        let processing_date = filter.processing_date;
        let candidates = self.store.fetch_templates(filter).await?;
        let candidate_count = candidates.len();
        info!(
            candidates = candidate_count,
            %processing_date,
            "starting generation pass"
        );

        let mut staged: Vec<TaskRecord> = Vec::new();
        let mut failures: Vec<TemplateFailure> = Vec::new();
        let mut skipped_not_due = 0usize;
        let mut skipped_existing = 0usize;

        for record in candidates {
            let task_id = record.id.clone();
            match self.evaluate(record, processing_date).await {
                Ok(Disposition::Stage(instance)) => staged.push(instance),
                Ok(Disposition::NotDue) => skipped_not_due += 1,
                Ok(Disposition::AlreadyGenerated) => skipped_existing += 1,
                Err(err) => {
                    if self.fail_fast && matches!(err, EngineError::Storage(_)) {
                        return Err(err);
                    }
                    warn!(task = %task_id, error = %err, "template skipped");
                    failures.push(TemplateFailure {
                        task_id,
                        message: err.to_string(),
                    });
                }
            }
        }

        let mut generated = 0usize;
        let mut insert_error = None;
        if !staged.is_empty() {
            match self.store.bulk_insert(staged).await {
                Ok(inserted) => generated = inserted.len(),
                Err(err) => {
                    error!(error = %err, "bulk insert failed, no instances persisted");
                    insert_error = Some(err.to_string());
                }
            }
        }

        let summary = RunSummary {
            processing_date,
            candidates: candidate_count,
            generated,
            skipped_not_due,
            skipped_existing,
            failures,
            insert_error,
            completed_at: Utc::now(),
        };
        info!(
            generated = summary.generated,
            skipped_not_due = summary.skipped_not_due,
            skipped_existing = summary.skipped_existing,
            errored = summary.errored(),
            success = summary.succeeded(),
            "generation pass finished"
        );
        Ok(summary)
    }

    async fn evaluate(
        &self,
        record: TaskRecord,
        processing_date: NaiveDate,
    ) -> Result<Disposition, EngineError> {
        let template = TemplateTask::from_record(record)?;

        if !should_fire(template.rule(), template.due_date(), processing_date) {
            debug!(task = %template.id(), "not due");
            return Ok(Disposition::NotDue);
        }

        if self
            .store
            .instance_exists_for_date(template.id(), processing_date)
            .await?
        {
            debug!(task = %template.id(), "instance already generated");
            return Ok(Disposition::AlreadyGenerated);
        }

        let due_date = match compute_due_date(template.rule(), template.due_date(), processing_date)
        {
            None => None,
            Some(DueDateOutcome::Computed(due)) => Some(due),
            Some(DueDateOutcome::Fallback { due, reason }) => {
                warn!(task = %template.id(), %reason, "due date computed via fallback");
                Some(due)
            }
        };

        let created_at = occurrence_timestamp(processing_date);
        Ok(Disposition::Stage(
            template.materialize(due_date, created_at).into_record(),
        ))
    }
}

/// Generation timestamp for an occurrence.
///
/// Pinned to the processing date's calendar day (at the current wall-clock
/// time-of-day) so the created-at idempotency guard holds under backfill and
/// replay, where the processing date is not today. When the pass runs on its
/// own date this is exactly the moment of generation.
fn occurrence_timestamp(processing_date: NaiveDate) -> DateTime<Utc> {
    processing_date.and_time(Utc::now().time()).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn occurrence_timestamp_lands_on_processing_date() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        let stamp = occurrence_timestamp(date);
        assert_eq!(stamp.date_naive(), date);
        assert_eq!(stamp.year(), 2023);
    }
}
