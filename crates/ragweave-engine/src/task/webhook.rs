//! Webhook delivery
//!
//! Posts task-trigger and task-complete envelopes to an external
//! workflow engine. Envelopes carry a timestamp, the task id, an event
//! type tag and a fixed source marker so receivers can route them.

use ragweave_core::task::{TaskNotifier, TaskResultReport};
use ragweave_core::{RagError, RagResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const EVENT_SOURCE: &str = "ragweave";

/// Webhook endpoints and timeout.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Endpoint that starts external tasks; empty disables triggering.
    pub trigger_url: String,
    /// Endpoint notified on completion; empty disables notification.
    pub completion_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            trigger_url: String::new(),
            completion_url: String::new(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for the two webhook endpoints.
pub struct WebhookClient {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> RagResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Initialization(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client, config })
    }

    fn trigger_envelope(task_id: &str, data: &Value) -> Value {
        json!({
            "timestamp": Utc::now().to_rfc3339(),
            "taskId": task_id,
            "type": "task_trigger",
            "data": data,
            "source": EVENT_SOURCE,
        })
    }

    fn completion_envelope(report: &TaskResultReport) -> Value {
        json!({
            "timestamp": Utc::now().to_rfc3339(),
            "taskId": report.task_id,
            "type": "task_complete",
            "status": report.status,
            "data": report.data,
            "metadata": report.metadata,
            "source": EVENT_SOURCE,
        })
    }

    /// Post a trigger envelope to start an external task.
    pub async fn trigger_task(&self, task_id: &str, data: &Value) -> RagResult<()> {
        if self.config.trigger_url.is_empty() {
            return Err(RagError::Trigger(
                "no trigger webhook URL configured".into(),
            ));
        }

        let envelope = Self::trigger_envelope(task_id, data);
        let response = self
            .client
            .post(&self.config.trigger_url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| RagError::Trigger(format!("trigger request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Trigger(format!(
                "trigger endpoint returned {status}: {body}"
            )));
        }
        debug!(task_id, "task trigger delivered");
        Ok(())
    }

    /// Post a completion envelope with the task result.
    pub async fn notify_completion(&self, report: &TaskResultReport) -> RagResult<()> {
        if self.config.completion_url.is_empty() {
            return Err(RagError::Notify(
                "no completion webhook URL configured".into(),
            ));
        }

        let envelope = Self::completion_envelope(report);
        let response = self
            .client
            .post(&self.config.completion_url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| RagError::Notify(format!("completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Notify(format!(
                "completion endpoint returned {status}: {body}"
            )));
        }
        debug!(task_id = %report.task_id, "task completion delivered");
        Ok(())
    }
}

#[async_trait]
impl TaskNotifier for WebhookClient {
    async fn trigger_task(&self, task_id: &str, payload: &Value) -> RagResult<()> {
        WebhookClient::trigger_task(self, task_id, payload).await
    }

    async fn notify_completion(&self, report: &TaskResultReport) -> RagResult<()> {
        WebhookClient::notify_completion(self, report).await
    }
}
