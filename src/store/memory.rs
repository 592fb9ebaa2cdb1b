//! In-memory Task Store
//!
//! HashMap-backed implementation used by tests and by embedders that bring
//! their own persistence. The idempotency guard scans `created_at` calendar
//! windows directly, matching the contract the sled store serves from its
//! occurrence index.

use crate::error::StorageError;
use crate::store::{TaskStore, TemplateFilter};
use crate::task::{TaskId, TaskRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    /// Snapshot of all records, for assertions in tests.
    pub fn all(&self) -> Vec<TaskRecord> {
        self.tasks.read().values().cloned().collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, id: &TaskId) -> Result<Option<TaskRecord>, StorageError> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn put(&self, record: &TaskRecord) -> Result<(), StorageError> {
        self.tasks.write().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch_templates(
        &self,
        filter: &TemplateFilter,
    ) -> Result<Vec<TaskRecord>, StorageError> {
        let mut templates: Vec<TaskRecord> = self
            .tasks
            .read()
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        // Deterministic batch order for stable summaries and tests.
        templates.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(templates)
    }

    async fn instance_exists_for_date(
        &self,
        template_id: &TaskId,
        date: NaiveDate,
    ) -> Result<bool, StorageError> {
        let exists = self.tasks.read().values().any(|record| {
            record.parent_task_id.as_ref() == Some(template_id)
                && record.created_at.date_naive() == date
        });
        Ok(exists)
    }

    async fn bulk_insert(
        &self,
        instances: Vec<TaskRecord>,
    ) -> Result<Vec<TaskId>, StorageError> {
        let mut tasks = self.tasks.write();

        // Validate the whole batch before touching the map: all-or-nothing,
        // like the sled transaction.
        let mut batch_occurrences = Vec::new();
        for instance in &instances {
            if let Some(parent) = &instance.parent_task_id {
                let occurrence = (parent.clone(), instance.created_at.date_naive());
                let duplicate_in_store = tasks.values().any(|record| {
                    record.parent_task_id.as_ref() == Some(&occurrence.0)
                        && record.created_at.date_naive() == occurrence.1
                });
                if duplicate_in_store || batch_occurrences.contains(&occurrence) {
                    return Err(StorageError::DuplicateOccurrence {
                        template_id: occurrence.0,
                        date: occurrence.1,
                    });
                }
                batch_occurrences.push(occurrence);
            }
        }

        let mut inserted = Vec::with_capacity(instances.len());
        for instance in instances {
            inserted.push(instance.id.clone());
            tasks.insert(instance.id.clone(), instance);
        }
        Ok(inserted)
    }
}
