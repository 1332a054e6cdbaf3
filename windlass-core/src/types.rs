//! Common types used by workflow code and the replay pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use windlass_proto::{WorkflowExecution, WorkflowType};

/// Information about the workflow execution being replayed, visible to
/// workflow code through its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: WorkflowType,
    pub attempt: i32,
}

impl WorkflowInfo {
    pub fn new(workflow_execution: WorkflowExecution, workflow_type: WorkflowType) -> Self {
        Self {
            workflow_execution,
            workflow_type,
            attempt: 1,
        }
    }
}

/// Options for scheduling an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Schedule to close timeout
    pub schedule_to_close_timeout: Duration,
    /// Start to close timeout
    pub start_to_close_timeout: Duration,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            schedule_to_close_timeout: Duration::from_secs(0),
            start_to_close_timeout: Duration::from_secs(0),
        }
    }
}
