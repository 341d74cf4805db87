//! Task orchestrator
//!
//! Delegates work to an external workflow engine over webhooks and
//! observes completion by polling a [`CompletionWatcher`]. Waiting is
//! bounded by a wall-clock timeout; callers can block, receive progress
//! callbacks, or detach with [`TaskOrchestrator::spawn_wait`] and cancel
//! the wait later. Cancelling abandons the local wait only; the remote
//! task keeps running.

use ragweave_core::task::{
    CompletionWatcher, Task, TaskNotifier, TaskProgress, TaskResultReport, TaskStatus,
};
use ragweave_core::{RagError, RagResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Callback invoked with a progress snapshot on every poll.
pub type ProgressFn = Box<dyn Fn(TaskProgress) + Send + Sync>;

/// Completion watcher backed by a shared status table.
///
/// External receivers (a webhook endpoint, a test) report status with
/// [`PollTableWatcher::set_status`]; the orchestrator polls it. Unknown
/// tasks read as `Triggered` (nothing reported yet).
#[derive(Default)]
pub struct PollTableWatcher {
    statuses: RwLock<HashMap<String, TaskStatus>>,
}

impl PollTableWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, task_id: impl Into<String>, status: TaskStatus) {
        self.statuses.write().await.insert(task_id.into(), status);
    }
}

#[async_trait]
impl CompletionWatcher for PollTableWatcher {
    async fn poll(&self, task_id: &str) -> RagResult<TaskStatus> {
        Ok(self
            .statuses
            .read()
            .await
            .get(task_id)
            .cloned()
            .unwrap_or(TaskStatus::Triggered))
    }
}

/// Handle to a detached wait started with [`TaskOrchestrator::spawn_wait`].
pub struct TaskWaitHandle {
    task_id: String,
    handle: JoinHandle<RagResult<Task>>,
    cancel_tx: watch::Sender<bool>,
}

impl TaskWaitHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Stop watching. The remote task keeps running; the handle then
    /// resolves to the task as last observed before cancellation.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Wait for the detached poll loop to finish.
    pub async fn wait(self) -> RagResult<Task> {
        self.handle
            .await
            .map_err(|e| RagError::Internal(format!("wait task aborted: {e}")))?
    }
}

/// Orchestrates trigger, wait and completion notification for tasks
/// executed by an external engine.
pub struct TaskOrchestrator {
    watcher: Arc<dyn CompletionWatcher>,
    notifier: Arc<dyn TaskNotifier>,
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    timeout: Duration,
    poll_interval: Duration,
}

impl TaskOrchestrator {
    pub fn new(
        watcher: Arc<dyn CompletionWatcher>,
        notifier: Arc<dyn TaskNotifier>,
        timeout_ms: u64,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            watcher,
            notifier,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
        }
    }

    /// Register a task and deliver its trigger event.
    ///
    /// Generates a task id when none is supplied. A failed delivery
    /// (including an unconfigured endpoint) unregisters the task and
    /// surfaces as a trigger error.
    pub async fn trigger_task(
        &self,
        payload: Value,
        task_id: Option<String>,
    ) -> RagResult<String> {
        let task_id = task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.tasks
            .write()
            .await
            .insert(task_id.clone(), Task::new(task_id.clone(), payload.clone()));

        if let Err(e) = self.notifier.trigger_task(&task_id, &payload).await {
            self.tasks.write().await.remove(&task_id);
            return Err(e);
        }

        info!(task_id, "task triggered");
        Ok(task_id)
    }

    /// Snapshot of a registered task.
    pub async fn task(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Block until the task reaches a terminal status or the wall-clock
    /// timeout elapses.
    pub async fn wait_for_completion(&self, task_id: &str) -> RagResult<Task> {
        self.wait_inner(task_id, None, None).await
    }

    /// Like [`wait_for_completion`](Self::wait_for_completion), invoking
    /// `on_progress` with a snapshot on every poll.
    pub async fn wait_with_progress(
        &self,
        task_id: &str,
        on_progress: ProgressFn,
    ) -> RagResult<Task> {
        self.wait_inner(task_id, Some(on_progress), None).await
    }

    async fn wait_inner(
        &self,
        task_id: &str,
        progress: Option<ProgressFn>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> RagResult<Task> {
        Self::poll_until_done(
            self.watcher.clone(),
            self.tasks.clone(),
            task_id.to_string(),
            self.timeout,
            self.poll_interval,
            progress,
            cancel,
        )
        .await
    }

    /// Detach the wait into a background task.
    pub fn spawn_wait(
        &self,
        task_id: impl Into<String>,
        on_progress: Option<ProgressFn>,
    ) -> TaskWaitHandle {
        let task_id = task_id.into();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::poll_until_done(
            self.watcher.clone(),
            self.tasks.clone(),
            task_id.clone(),
            self.timeout,
            self.poll_interval,
            on_progress,
            Some(cancel_rx),
        ));
        TaskWaitHandle {
            task_id,
            handle,
            cancel_tx,
        }
    }

    async fn poll_until_done(
        watcher: Arc<dyn CompletionWatcher>,
        tasks: Arc<RwLock<HashMap<String, Task>>>,
        task_id: String,
        timeout: Duration,
        poll_interval: Duration,
        progress: Option<ProgressFn>,
        mut cancel: Option<watch::Receiver<bool>>,
    ) -> RagResult<Task> {
        // Snapshot the table entry with the given status applied; waits
        // on unregistered ids still resolve to a usable record.
        async fn snapshot(
            tasks: &RwLock<HashMap<String, Task>>,
            task_id: &str,
            status: TaskStatus,
        ) -> Task {
            let mut guard = tasks.write().await;
            match guard.get_mut(task_id) {
                Some(task) => {
                    task.transition(status);
                    task.clone()
                }
                None => {
                    let mut task = Task::new(task_id, Value::Null);
                    task.transition(status);
                    task
                }
            }
        }

        let started = Instant::now();
        let mut last_status = TaskStatus::Triggered;

        loop {
            let status = watcher.poll(&task_id).await?;
            last_status = status.clone();
            let task = snapshot(&tasks, &task_id, status.clone()).await;

            if status.is_terminal() {
                if let Some(on_progress) = &progress {
                    on_progress(TaskProgress {
                        task_id: task_id.clone(),
                        status: status.clone(),
                        progress_percent: 100,
                    });
                }
                debug!(task_id, ?status, "task finished");
                return Ok(task);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                snapshot(&tasks, &task_id, TaskStatus::TimedOut).await;
                warn!(task_id, elapsed_ms = elapsed.as_millis() as u64, "task wait timed out");
                return Err(RagError::timeout(elapsed.as_millis() as u64));
            }

            if let Some(on_progress) = &progress {
                // Time-based estimate; the engine reports no real progress.
                let percent =
                    ((elapsed.as_millis() * 100 / timeout.as_millis().max(1)) as u8).min(99);
                on_progress(TaskProgress {
                    task_id: task_id.clone(),
                    status: status.clone(),
                    progress_percent: percent,
                });
            }

            match &mut cancel {
                Some(rx) => {
                    tokio::select! {
                        _ = sleep(poll_interval) => {}
                        result = rx.changed() => {
                            if result.is_ok() && *rx.borrow() {
                                debug!(task_id, "task wait cancelled");
                                return Ok(snapshot(&tasks, &task_id, last_status).await);
                            }
                        }
                    }
                }
                None => sleep(poll_interval).await,
            }
        }
    }

    /// Deliver a completion notification, logging instead of failing.
    pub async fn notify_completion(&self, report: &TaskResultReport) {
        if let Err(e) = self.notifier.notify_completion(report).await {
            warn!(task_id = %report.task_id, error = %e, "completion notification failed");
        }
    }

    /// Full delegation flow: trigger, wait, notify, report.
    ///
    /// Notification is best-effort in every outcome; a timeout still
    /// posts a timed-out report before the error propagates.
    pub async fn execute(&self, payload: Value) -> RagResult<TaskResultReport> {
        let task_id = self.trigger_task(payload, None).await?;

        match self.wait_for_completion(&task_id).await {
            Ok(task) => {
                let report = TaskResultReport {
                    task_id: task.task_id,
                    status: task.status,
                    data: task.payload,
                    metadata: HashMap::new(),
                };
                self.notify_completion(&report).await;
                Ok(report)
            }
            Err(e) => {
                let report = TaskResultReport {
                    task_id,
                    status: TaskStatus::TimedOut,
                    data: json!({}),
                    metadata: HashMap::new(),
                };
                self.notify_completion(&report).await;
                Err(e)
            }
        }
    }
}
