//! Decision-task and response shapes exchanged with the orchestration
//! service.
//!
//! A handled task produces exactly one of the three respond requests.

use crate::shared::{
    Decision, History, QueryTaskCompletedType, WorkflowExecution, WorkflowQuery, WorkflowType,
};
use serde::{Deserialize, Serialize};

/// One unit of replay/decide work handed out by the orchestration service.
///
/// Immutable once received; owned by a single processing attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollForDecisionTaskResponse {
    /// Opaque token addressing the eventual response
    pub task_token: Vec<u8>,
    pub workflow_execution: Option<WorkflowExecution>,
    pub workflow_type: Option<WorkflowType>,
    pub previous_started_event_id: i64,
    pub started_event_id: i64,
    pub attempt: i64,
    pub history: Option<History>,
    /// Read-only query to answer instead of producing decisions
    pub query: Option<WorkflowQuery>,
    /// Sticky context blob returned by the previous decide pass, if any
    pub execution_context: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondDecisionTaskCompletedRequest {
    pub task_token: Vec<u8>,
    pub decisions: Vec<Decision>,
    pub execution_context: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondDecisionTaskFailedRequest {
    pub task_token: Vec<u8>,
    /// Human-readable diagnostic, the only unstructured error detail surfaced
    pub details: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespondQueryTaskCompletedRequest {
    pub task_token: Vec<u8>,
    pub completed_type: QueryTaskCompletedType,
    pub query_result: Option<Vec<u8>>,
    pub error_message: Option<String>,
}
