//! Long-running task orchestration: webhook delivery, completion
//! polling and timeout handling.

pub mod orchestrator;
pub mod webhook;

pub use orchestrator::{PollTableWatcher, TaskOrchestrator, TaskWaitHandle};
pub use webhook::WebhookClient;
