//! Task records and role views
//!
//! One storage shape (`TaskRecord`) backs two mutually exclusive roles: a
//! `TemplateTask` that owns a recurrence rule, and a `GeneratedInstance`
//! produced from a template for a single occurrence. The views are constructed
//! rather than flagged, so "instances never recur" and "only templates are
//! candidates" hold structurally instead of by convention.

use crate::error::EngineError;
use crate::recurrence::Recurrence;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// Workflow state of a task record.
///
/// `Active` marks an eligible recurrence template; `Todo` is the initial state
/// stamped onto generated instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Todo,
    InProgress,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// TaskRecord: the underlying storage shape shared by templates and instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub workspace_id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub estimated_hours: Option<f64>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub assignee: Option<String>,
    pub created_by: String,
    /// Non-null marks a generated instance; the referenced id is the template.
    pub parent_task_id: Option<TaskId>,
    /// Raw JSON-encoded recurrence rule. Parsed once, at the template-view
    /// boundary; absence means the task does not recur.
    pub recurrence_pattern: Option<String>,
    pub recurrence_end_date: Option<NaiveDate>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of a task record in its template role.
///
/// Construction validates the role invariants and parses the recurrence rule,
/// so downstream evaluation never handles raw payloads or misfiled records.
#[derive(Debug, Clone)]
pub struct TemplateTask {
    record: TaskRecord,
    rule: Recurrence,
}

impl TemplateTask {
    pub fn from_record(record: TaskRecord) -> Result<Self, EngineError> {
        if record.parent_task_id.is_some() {
            return Err(EngineError::NotATemplate {
                task_id: record.id.clone(),
                reason: "record is a generated instance (non-null parent)".to_string(),
            });
        }
        if record.status != TaskStatus::Active {
            return Err(EngineError::NotATemplate {
                task_id: record.id.clone(),
                reason: format!("status is {:?}, expected Active", record.status),
            });
        }
        let raw = record
            .recurrence_pattern
            .as_deref()
            .ok_or_else(|| EngineError::NotATemplate {
                task_id: record.id.clone(),
                reason: "no recurrence pattern".to_string(),
            })?;
        let rule = Recurrence::parse(raw).map_err(|e| EngineError::InvalidRecurrence {
            task_id: record.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(TemplateTask { record, rule })
    }

    pub fn id(&self) -> &TaskId {
        &self.record.id
    }

    pub fn rule(&self) -> &Recurrence {
        &self.rule
    }

    /// Reference due date: the anchor for interval math and the source of the
    /// time-of-day stamped onto generated instances.
    pub fn due_date(&self) -> Option<&DateTime<Utc>> {
        self.record.due_date.as_ref()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.record.recurrence_end_date
    }

    /// Materialize one occurrence of this template.
    ///
    /// The instance id is derived from the template id and the occurrence
    /// date, which makes the id itself unique per (template, date).
    pub fn materialize(
        &self,
        due_date: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> GeneratedInstance {
        let occurrence = created_at.date_naive();
        let record = TaskRecord {
            id: TaskId::new(format!("{}:{}", self.record.id, occurrence)),
            workspace_id: self.record.workspace_id.clone(),
            project_id: self.record.project_id.clone(),
            title: self.record.title.clone(),
            description: self.record.description.clone(),
            status: TaskStatus::Todo,
            priority: self.record.priority,
            estimated_hours: self.record.estimated_hours,
            category: self.record.category.clone(),
            tags: self.record.tags.clone(),
            assignee: self.record.assignee.clone(),
            created_by: self.record.created_by.clone(),
            parent_task_id: Some(self.record.id.clone()),
            recurrence_pattern: None,
            recurrence_end_date: None,
            due_date,
            created_at,
        };
        GeneratedInstance { record }
    }
}

/// Write-only view of a freshly materialized instance.
///
/// Only `TemplateTask::materialize` constructs one, so an instance always
/// carries a parent back-reference, the initial workflow state, and no
/// recurrence fields of its own.
#[derive(Debug, Clone)]
pub struct GeneratedInstance {
    record: TaskRecord,
}

impl GeneratedInstance {
    pub fn into_record(self) -> TaskRecord {
        self.record
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }
}
