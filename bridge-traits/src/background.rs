//! Deferred Execution and Task Scheduling
//!
//! Provides the platform-aware facility that runs a unit of work later,
//! possibly outside the lifetime of the process that enqueued it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

/// Task execution constraints
#[derive(Debug, Clone)]
pub struct TaskConstraints {
    /// Hold the task until some network connection is available
    pub requires_network: bool,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            requires_network: true,
        }
    }
}

/// Scheduled task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Task execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is enqueued but not yet running
    Scheduled,
    /// Task is currently executing
    Running,
    /// Last attempt asked for re-delivery; waiting for the next attempt
    Retrying { attempt: u32 },
    /// Task completed successfully
    Completed,
    /// Task failed permanently
    Failed,
    /// Task was cancelled
    Cancelled,
}

/// Opaque key/value input handed to a worker (WorkManager `Data` equivalent)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    values: HashMap<String, String>,
}

impl TaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Result a worker reports back to the scheduling facility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkResult {
    Success,
    /// Transient failure; the facility should deliver the task again
    Retry,
    /// Permanent failure; do not deliver again
    Failure,
}

/// A unit of deferred work
#[async_trait]
pub trait DeferredWorker: Send + Sync {
    async fn do_work(&self, input: &TaskInput) -> WorkResult;
}

/// Deferred task scheduler trait
///
/// Abstracts platform-specific deferred execution with at-least-once delivery:
/// - **Android**: WorkManager `OneTimeWorkRequest`
/// - **iOS**: BGTaskScheduler processing tasks
/// - **Desktop**: Tokio tasks with in-process re-delivery
///
/// Workers are registered by name before tasks referencing that name are
/// enqueued.
#[async_trait]
pub trait DeferredTaskScheduler: Send + Sync {
    /// Register the worker that handles tasks named `task_name`
    async fn register_worker(&self, task_name: &str, worker: Arc<dyn DeferredWorker>)
        -> Result<()>;

    /// Enqueue one execution of `task_name` with the given input
    async fn enqueue(
        &self,
        task_name: &str,
        input: TaskInput,
        constraints: TaskConstraints,
    ) -> Result<TaskId>;

    /// Cancel an enqueued task
    async fn cancel_task(&self, task_id: &TaskId) -> Result<()>;

    /// Get status of a task
    async fn get_task_status(&self, task_id: &TaskId) -> Result<TaskStatus>;

    /// List all known tasks
    async fn list_tasks(&self) -> Result<Vec<TaskId>>;
}
