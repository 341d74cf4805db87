//! Long-running task contracts
//!
//! Types for work delegated to an external workflow engine, plus the
//! pluggable completion-observation and event-delivery seams consumed
//! by the task orchestrator in `ragweave-engine`.

pub mod types;

pub use types::{
    CompletionWatcher, Task, TaskNotifier, TaskProgress, TaskResultReport, TaskStatus,
};
