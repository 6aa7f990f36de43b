//! Deferred task scheduling with Tokio

use async_trait::async_trait;
use bridge_traits::{
    background::{
        DeferredTaskScheduler, DeferredWorker, TaskConstraints, TaskId, TaskInput, TaskStatus,
        WorkResult,
    },
    error::{BridgeError, Result},
    network::ConnectivityProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const CONSTRAINT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Exponential re-delivery policy applied when a worker returns [`WorkResult::Retry`]
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Re-deliveries allowed before the task is marked failed; `None` is unbounded
    pub max_attempts: Option<u32>,
}

impl RetryBackoff {
    /// Delay before the given re-delivery (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(5 * 60 * 60),
            max_attempts: Some(10),
        }
    }
}

struct TaskInfo {
    task_name: String,
    status: TaskStatus,
    handle: Option<JoinHandle<()>>,
    cancel: Option<oneshot::Sender<()>>,
}

type TaskTable = Arc<RwLock<HashMap<TaskId, TaskInfo>>>;

/// Tokio-based deferred scheduler for desktop.
///
/// Tasks live only as long as the process; re-delivery after a
/// [`WorkResult::Retry`] follows [`RetryBackoff`].
pub struct TokioDeferredScheduler {
    tasks: TaskTable,
    workers: Arc<RwLock<HashMap<String, Arc<dyn DeferredWorker>>>>,
    connectivity: Option<Arc<dyn ConnectivityProvider>>,
    backoff: RetryBackoff,
}

impl TokioDeferredScheduler {
    /// Create a scheduler that treats network constraints as satisfied.
    pub fn new() -> Self {
        Self::with_connectivity(None)
    }

    /// Create a scheduler that checks network constraints against `provider`.
    pub fn with_connectivity(provider: Option<Arc<dyn ConnectivityProvider>>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            workers: Arc::new(RwLock::new(HashMap::new())),
            connectivity: provider,
            backoff: RetryBackoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn constraints_satisfied(
        provider: Option<&Arc<dyn ConnectivityProvider>>,
        constraints: &TaskConstraints,
    ) -> bool {
        if !constraints.requires_network {
            return true;
        }

        match provider {
            Some(provider) => provider.active_snapshot().is_some(),
            None => true,
        }
    }

    async fn set_status(tasks: &TaskTable, id: &TaskId, status: TaskStatus) {
        if let Some(info) = tasks.write().await.get_mut(id) {
            info.status = status;
        }
    }

    /// Sleep unless cancelled first; returns `false` on cancellation.
    async fn wait_or_cancel(delay: Duration, cancel_rx: &mut oneshot::Receiver<()>) -> bool {
        tokio::select! {
            _ = cancel_rx => false,
            _ = sleep(delay) => true,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_task(
        tasks: TaskTable,
        id: TaskId,
        worker: Arc<dyn DeferredWorker>,
        input: TaskInput,
        constraints: TaskConstraints,
        mut cancel_rx: oneshot::Receiver<()>,
        provider: Option<Arc<dyn ConnectivityProvider>>,
        backoff: RetryBackoff,
    ) {
        let mut attempt = 0u32;

        loop {
            while !Self::constraints_satisfied(provider.as_ref(), &constraints) {
                debug!(task_id = %id.0, "Constraints not satisfied; waiting");
                if !Self::wait_or_cancel(CONSTRAINT_POLL_INTERVAL, &mut cancel_rx).await {
                    return;
                }
            }

            Self::set_status(&tasks, &id, TaskStatus::Running).await;
            match worker.do_work(&input).await {
                WorkResult::Success => {
                    info!(task_id = %id.0, "Deferred task completed");
                    Self::set_status(&tasks, &id, TaskStatus::Completed).await;
                    return;
                }
                WorkResult::Failure => {
                    warn!(task_id = %id.0, "Deferred task failed permanently");
                    Self::set_status(&tasks, &id, TaskStatus::Failed).await;
                    return;
                }
                WorkResult::Retry => {
                    attempt += 1;
                    if backoff.max_attempts.is_some_and(|max| attempt > max) {
                        warn!(task_id = %id.0, attempt, "Deferred task exhausted retries");
                        Self::set_status(&tasks, &id, TaskStatus::Failed).await;
                        return;
                    }

                    let delay = backoff.delay_for(attempt);
                    debug!(
                        task_id = %id.0,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Deferred task asked for retry"
                    );
                    Self::set_status(&tasks, &id, TaskStatus::Retrying { attempt }).await;
                    if !Self::wait_or_cancel(delay, &mut cancel_rx).await {
                        return;
                    }
                }
            }
        }
    }
}

impl Default for TokioDeferredScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeferredTaskScheduler for TokioDeferredScheduler {
    async fn register_worker(
        &self,
        task_name: &str,
        worker: Arc<dyn DeferredWorker>,
    ) -> Result<()> {
        self.workers
            .write()
            .await
            .insert(task_name.to_string(), worker);
        Ok(())
    }

    async fn enqueue(
        &self,
        task_name: &str,
        input: TaskInput,
        constraints: TaskConstraints,
    ) -> Result<TaskId> {
        let worker = self
            .workers
            .read()
            .await
            .get(task_name)
            .cloned()
            .ok_or_else(|| {
                BridgeError::OperationFailed(format!("No worker registered for task: {}", task_name))
            })?;

        let id = TaskId::generate();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        debug!(task_id = %id.0, task_name, "Enqueuing deferred task");

        // Hold the table lock until the handle is stored so the task cannot
        // observe a missing entry.
        let mut tasks = self.tasks.write().await;
        let handle = tokio::spawn(Self::run_task(
            Arc::clone(&self.tasks),
            id.clone(),
            worker,
            input,
            constraints,
            cancel_rx,
            self.connectivity.clone(),
            self.backoff.clone(),
        ));
        tasks.insert(
            id.clone(),
            TaskInfo {
                task_name: task_name.to_string(),
                status: TaskStatus::Scheduled,
                handle: Some(handle),
                cancel: Some(cancel_tx),
            },
        );

        Ok(id)
    }

    async fn cancel_task(&self, task_id: &TaskId) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let info = tasks
            .get_mut(task_id)
            .ok_or_else(|| BridgeError::OperationFailed(format!("Task not found: {:?}", task_id)))?;

        if matches!(info.status, TaskStatus::Completed | TaskStatus::Failed) {
            return Ok(());
        }

        if let Some(cancel) = info.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = info.handle.take() {
            handle.abort();
        }
        info.status = TaskStatus::Cancelled;

        debug!(task_id = %task_id.0, task_name = %info.task_name, "Cancelled deferred task");
        Ok(())
    }

    async fn get_task_status(&self, task_id: &TaskId) -> Result<TaskStatus> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .map(|info| info.status.clone())
            .ok_or_else(|| BridgeError::OperationFailed(format!("Task not found: {:?}", task_id)))
    }

    async fn list_tasks(&self) -> Result<Vec<TaskId>> {
        Ok(self.tasks.read().await.keys().cloned().collect())
    }
}
