//! Workflow futures and errors.

use std::future::Future;
use std::pin::Pin;

/// Deferred result of a command submitted by workflow code (an activity,
/// a timer, etc.). Resolves from history during replay, or stays pending
/// until the orchestration service records the outcome.
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>;

/// Workflow error
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error("Activity failed: {0}")]
    ActivityFailed(String),
    #[error("Operation canceled")]
    Canceled,
    #[error("Generic error: {0}")]
    Generic(String),
}
