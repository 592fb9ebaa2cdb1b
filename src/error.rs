//! Error types for the recurring task materialization engine.

use crate::task::TaskId;
use chrono::NaiveDate;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Duplicate occurrence for template {template_id} on {date}")]
    DuplicateOccurrence { template_id: TaskId, date: NaiveDate },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

/// Engine-level errors for batch generation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Task {task_id} carries an invalid recurrence pattern: {reason}")]
    InvalidRecurrence { task_id: TaskId, reason: String },

    #[error("Task {task_id} is not a recurrence template: {reason}")]
    NotATemplate { task_id: TaskId, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}
