//! Persistence of workflow execution records.

use crate::error::StateError;
use async_trait::async_trait;
use skillflow_core::WorkflowExecution;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage for [`WorkflowExecution`] records keyed by trace id.
///
/// Saving is last-write-wins per trace id.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, execution: &WorkflowExecution) -> Result<(), StateError>;

    /// Returns `None` when no record exists for `trace_id`.
    async fn load(&self, trace_id: &str) -> Result<Option<WorkflowExecution>, StateError>;

    /// All stored records, ordered by trace id.
    async fn list(&self) -> Result<Vec<WorkflowExecution>, StateError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, trace_id: &str) -> Result<bool, StateError>;
}

/// Process-local store holding each record as a JSON document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStateStore {
    records: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn save(&self, execution: &WorkflowExecution) -> Result<(), StateError> {
        let doc = serde_json::to_string(execution)?;
        self.records
            .write()
            .await
            .insert(execution.trace_id.clone(), doc);
        Ok(())
    }

    async fn load(&self, trace_id: &str) -> Result<Option<WorkflowExecution>, StateError> {
        let records = self.records.read().await;
        match records.get(trace_id) {
            Some(doc) => Ok(Some(serde_json::from_str(doc)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<WorkflowExecution>, StateError> {
        let records = self.records.read().await;
        let mut executions = records
            .values()
            .map(|doc| serde_json::from_str::<WorkflowExecution>(doc))
            .collect::<Result<Vec<_>, _>>()?;
        executions.sort_by(|a, b| a.trace_id.cmp(&b.trace_id));
        Ok(executions)
    }

    async fn delete(&self, trace_id: &str) -> Result<bool, StateError> {
        Ok(self.records.write().await.remove(trace_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillflow_core::{
        ExecutionStatus, SkillInput, WorkflowDefinition, WorkflowStep,
    };
    use tokio_test::{assert_err, assert_ok};

    fn execution(trace_id: &str) -> WorkflowExecution {
        let workflow =
            WorkflowDefinition::new("deliver", "collect").step(WorkflowStep::for_skill("collect"));
        WorkflowExecution::start(&workflow, trace_id, SkillInput::new(trace_id, "deliver"))
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let store = InMemoryStateStore::new();
        let mut record = execution("t-1");
        record.status = ExecutionStatus::Paused;

        assert_ok!(store.save(&record).await);
        let loaded = assert_ok!(store.load("t-1").await);
        assert_eq!(loaded, Some(record));
        assert_eq!(assert_ok!(store.load("t-404").await), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryStateStore::new();
        let mut record = execution("t-1");
        store.save(&record).await.unwrap();

        record.status = ExecutionStatus::Success;
        store.save(&record).await.unwrap();

        assert_eq!(store.len().await, 1);
        let loaded = store.load("t-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = InMemoryStateStore::new();
        for id in ["t-b", "t-a", "t-c"] {
            store.save(&execution(id)).await.unwrap();
        }

        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.trace_id)
            .collect();
        assert_eq!(ids, vec!["t-a", "t-b", "t-c"]);

        assert!(store.delete("t-b").await.unwrap());
        assert!(!store.delete("t-b").await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let store = InMemoryStateStore::new();
        store
            .records
            .write()
            .await
            .insert("t-x".to_string(), "{not json".to_string());

        assert_err!(store.load("t-x").await);
        assert_err!(store.list().await);
    }
}
