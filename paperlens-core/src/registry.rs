//! Task registry: asynchronous job state keyed by task id.
//!
//! The orchestrator writes progress, result, and error into the registry at
//! coarse checkpoints; retrieval transport belongs to the caller. The
//! in-memory implementation keeps bounded retention: the oldest records are
//! evicted once `max_records` is exceeded, so a long-lived process cannot
//! accumulate task state without bound.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::types::{AnalysisStatus, PaperAnalysis, TaskRecord};

/// One checkpoint update applied to a task record. Unset fields are left
/// untouched.
#[derive(Debug, Default)]
pub struct TaskUpdate {
    pub status: Option<AnalysisStatus>,
    pub progress: Option<u8>,
    pub result: Option<PaperAnalysis>,
    pub error: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: AnalysisStatus, progress: u8) -> Self {
        Self {
            status: Some(status),
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed(result: PaperAnalysis) -> Self {
        Self {
            status: Some(AnalysisStatus::Completed),
            progress: Some(100),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(AnalysisStatus::Failed),
            progress: None,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Registry of asynchronous analysis tasks.
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    /// Register a fresh task in the `Pending` state.
    async fn create(&self, task_id: &str);

    /// Apply a checkpoint update. Unknown task ids are ignored.
    async fn update(&self, task_id: &str, update: TaskUpdate);

    /// Fetch a task record by id.
    async fn get(&self, task_id: &str) -> Option<TaskRecord>;
}

/// In-memory registry with bounded FIFO retention.
pub struct InMemoryTaskRegistry {
    max_records: usize,
    inner: RwLock<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    records: HashMap<String, TaskRecord>,
    order: VecDeque<String>,
}

impl InMemoryTaskRegistry {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            inner: RwLock::new(RegistryState::default()),
        }
    }

    /// Number of currently retained records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TaskRegistry for InMemoryTaskRegistry {
    async fn create(&self, task_id: &str) {
        let mut state = self.inner.write().await;
        if state.records.contains_key(task_id) {
            return;
        }
        state
            .records
            .insert(task_id.to_string(), TaskRecord::new(task_id));
        state.order.push_back(task_id.to_string());
        while state.records.len() > self.max_records {
            if let Some(oldest) = state.order.pop_front() {
                state.records.remove(&oldest);
            }
        }
    }

    async fn update(&self, task_id: &str, update: TaskUpdate) {
        let mut state = self.inner.write().await;
        if let Some(record) = state.records.get_mut(task_id) {
            if let Some(status) = update.status {
                record.status = status;
            }
            if let Some(progress) = update.progress {
                record.progress = progress.min(100);
            }
            if let Some(result) = update.result {
                record.result = Some(result);
            }
            if let Some(error) = update.error {
                record.error = Some(error);
            }
        }
    }

    async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.inner.read().await.records.get(task_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = InMemoryTaskRegistry::new(16);
        registry.create("t1").await;
        let record = registry.get("t1").await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Pending);
        assert_eq!(record.progress, 0);
    }

    #[tokio::test]
    async fn test_update_checkpoints() {
        let registry = InMemoryTaskRegistry::new(16);
        registry.create("t1").await;

        registry
            .update("t1", TaskUpdate::status(AnalysisStatus::Parsing, 10))
            .await;
        let record = registry.get("t1").await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Parsing);
        assert_eq!(record.progress, 10);

        registry
            .update("t1", TaskUpdate::failed("parse exploded"))
            .await;
        let record = registry.get("t1").await.unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("parse exploded"));
        // Progress untouched by the failure update
        assert_eq!(record.progress, 10);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let registry = InMemoryTaskRegistry::new(16);
        registry
            .update("ghost", TaskUpdate::status(AnalysisStatus::Parsing, 10))
            .await;
        assert!(registry.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_progress_capped_at_100() {
        let registry = InMemoryTaskRegistry::new(16);
        registry.create("t1").await;
        registry
            .update("t1", TaskUpdate::status(AnalysisStatus::Analyzing, 255))
            .await;
        assert_eq!(registry.get("t1").await.unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_bounded_retention_evicts_oldest() {
        let registry = InMemoryTaskRegistry::new(3);
        for i in 0..5 {
            registry.create(&format!("t{i}")).await;
        }
        assert_eq!(registry.len().await, 3);
        assert!(registry.get("t0").await.is_none());
        assert!(registry.get("t1").await.is_none());
        assert!(registry.get("t2").await.is_some());
        assert!(registry.get("t4").await.is_some());
    }

    #[tokio::test]
    async fn test_create_existing_id_keeps_record() {
        let registry = InMemoryTaskRegistry::new(16);
        registry.create("t1").await;
        registry
            .update("t1", TaskUpdate::status(AnalysisStatus::Analyzing, 40))
            .await;
        registry.create("t1").await;
        assert_eq!(
            registry.get("t1").await.unwrap().status,
            AnalysisStatus::Analyzing
        );
    }
}
