//! Task Store
//!
//! The engine's single collaborator: a store it can query for recurrence
//! candidates and insert generated instances into. Two implementations ship,
//! a sled-backed store for the binary and an in-memory store for tests and
//! embedding.

pub mod memory;
pub mod persistence;

pub use memory::InMemoryTaskStore;
pub use persistence::SledTaskStore;

use crate::error::StorageError;
use crate::task::{TaskId, TaskRecord, TaskStatus};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Candidate filter for one generation pass.
///
/// A record qualifies when it is an active template (status `Active`, no
/// parent), carries a recurrence pattern, and its recurrence window has not
/// ended before the processing date. Both store implementations apply the
/// same predicate via [`TemplateFilter::matches`].
#[derive(Debug, Clone)]
pub struct TemplateFilter {
    pub processing_date: NaiveDate,
    /// Restrict the pass to a single workspace; `None` spans all tenants.
    pub workspace_id: Option<String>,
}

impl TemplateFilter {
    pub fn for_date(processing_date: NaiveDate) -> Self {
        TemplateFilter {
            processing_date,
            workspace_id: None,
        }
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    pub fn matches(&self, record: &TaskRecord) -> bool {
        if record.status != TaskStatus::Active {
            return false;
        }
        if record.parent_task_id.is_some() {
            return false;
        }
        if record.recurrence_pattern.is_none() {
            return false;
        }
        if let Some(end) = record.recurrence_end_date {
            if end < self.processing_date {
                return false;
            }
        }
        if let Some(ref workspace) = self.workspace_id {
            if &record.workspace_id != workspace {
                return false;
            }
        }
        true
    }
}

/// Task Store interface
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, StorageError>;

    async fn put(&self, record: &TaskRecord) -> Result<(), StorageError>;

    /// Fetch recurrence candidates for one generation pass. The only bulk
    /// read the engine performs.
    async fn fetch_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<TaskRecord>, StorageError>;

    /// Idempotency guard: does a generated instance of this template already
    /// exist within the date's calendar-day window?
    async fn instance_exists_for_date(
        &self,
        template_id: &TaskId,
        date: NaiveDate,
    ) -> Result<bool, StorageError>;

    /// Insert all staged instances as a single atomic batch. A duplicate
    /// occurrence anywhere in the batch fails the whole call without
    /// inserting anything.
    async fn bulk_insert(
        &self,
        instances: Vec<TaskRecord>,
    ) -> Result<Vec<TaskId>, StorageError>;
}
