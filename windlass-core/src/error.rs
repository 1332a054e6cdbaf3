//! Error types for the Windlass replay engine.
//!
//! `EngineError` is the umbrella error for the decide/query pipeline. The
//! decision task handler is the only place these are caught wholesale;
//! everywhere else they propagate with `?`.

use thiserror::Error;

/// Error type for panics recovered at the task-handler boundary
#[derive(Debug, Clone, Error)]
#[error("PanicError: {message}")]
pub struct PanicError {
    pub message: String,
}

impl PanicError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for the replay pipeline
#[derive(Debug, Error)]
pub enum EngineError {
    /// The workflow factory does not know the requested type
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// The decision task or its history is missing required pieces
    #[error("malformed decision task: {0}")]
    MalformedTask(String),

    /// A usage/contract violation by SDK-internal or workflow-author code.
    /// Never recovered silently.
    #[error("contract violation: {0}")]
    Contract(String),

    /// Workflow logic raised during a decide pass
    #[error("workflow execution failed: {0}")]
    WorkflowFailed(String),

    /// A query could not be answered; localized, never fails the task
    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    Panic(#[from] PanicError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Best-effort extraction of a panic payload's message
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

pub fn is_contract_violation(err: &EngineError) -> bool {
    matches!(err, EngineError::Contract(_))
}

pub fn is_query_failure(err: &EngineError) -> bool {
    matches!(err, EngineError::QueryFailed(_))
}
