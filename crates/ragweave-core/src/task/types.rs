//! Task lifecycle types

use crate::error::RagResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Status of a delegated task.
///
/// `Completed`, `Failed` and `TimedOut` are terminal; a task never holds
/// two terminal statuses and is immutable once it reaches one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Triggered,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Work delegated to an external workflow engine.
///
/// Created when triggered, mutated only by the polling loop transitioning
/// `status`, and destroyed when the in-memory orchestration call returns —
/// there is no persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub status: TaskStatus,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_id: impl Into<String>, payload: Value) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Triggered,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Transition to a new status. Terminal statuses are sticky: once the
    /// task has finished, further transitions are ignored.
    pub fn transition(&mut self, status: TaskStatus) {
        if !self.status.is_terminal() {
            self.status = status;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Progress snapshot delivered to the caller on every poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress_percent: u8,
}

/// Result payload posted to the completion receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultReport {
    pub task_id: String,
    pub status: TaskStatus,
    pub data: Value,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TaskResultReport {
    pub fn completed(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Completed,
            data,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Pluggable completion observation.
///
/// The polling orchestrator consumes this seam; a push-based mechanism
/// (webhook receiver, channel) can replace the bundled poll-table watcher
/// without touching the orchestrator's public contract.
#[async_trait]
pub trait CompletionWatcher: Send + Sync {
    /// Report the currently-known status of a task.
    async fn poll(&self, task_id: &str) -> RagResult<TaskStatus>;
}

/// Outbound delivery of task lifecycle events to the external engine.
///
/// The orchestrator announces new tasks and posts result reports through
/// this seam. The bundled webhook client implements it over HTTP and
/// fails with `RagError::Trigger`/`RagError::Notify` when its endpoint
/// is unconfigured, so a misconfigured deployment surfaces at trigger
/// time instead of silently doing nothing.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    /// Announce a new task, carrying its payload.
    async fn trigger_task(&self, task_id: &str, payload: &Value) -> RagResult<()>;

    /// Deliver the final result report.
    async fn notify_completion(&self, report: &TaskResultReport) -> RagResult<()>;
}
