//! Decision task handler.
//!
//! The handler is the isolation boundary of the replay pipeline: whatever
//! a workflow does, exactly one response envelope comes back and nothing
//! escapes to the caller. A buggy workflow fails its own task, never the
//! process hosting many workflows.

use crate::executor::decider::ReplayDecider;
use crate::history::HistoryCursor;
use crate::registry::WorkflowFactory;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};
use windlass_core::{panic_message, EngineResult, WorkflowInfo};
use windlass_proto::{
    PollForDecisionTaskResponse, QueryTaskCompletedType, RespondDecisionTaskCompletedRequest,
    RespondDecisionTaskFailedRequest, RespondQueryTaskCompletedRequest,
};

/// Result envelope for one handled decision task. Exactly one outbound
/// response per task.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTaskResult {
    /// Decide pass succeeded: ordered decisions plus the context blob
    Completed(RespondDecisionTaskCompletedRequest),
    /// The task as a whole failed; carries the diagnostic text
    Failed(RespondDecisionTaskFailedRequest),
    /// The task carried a query; covers both query success and query
    /// failure, distinguished by the completed type
    QueryCompleted(RespondQueryTaskCompletedRequest),
}

impl DecisionTaskResult {
    pub fn task_token(&self) -> &[u8] {
        match self {
            DecisionTaskResult::Completed(r) => &r.task_token,
            DecisionTaskResult::Failed(r) => &r.task_token,
            DecisionTaskResult::QueryCompleted(r) => &r.task_token,
        }
    }
}

/// Handles decision tasks by replaying history against workflow
/// definitions resolved through the factory.
pub struct DecisionTaskHandler {
    factory: Arc<dyn WorkflowFactory>,
}

impl DecisionTaskHandler {
    pub fn new(factory: Arc<dyn WorkflowFactory>) -> Self {
        Self { factory }
    }

    /// Process one decision task. Never returns an error and never
    /// panics outward: every failure becomes a task-failed envelope
    /// carrying the original task token.
    pub async fn handle_decision_task(
        &self,
        task: PollForDecisionTaskResponse,
    ) -> DecisionTaskResult {
        let task_token = task.task_token.clone();
        let workflow_execution = task.workflow_execution.clone();
        let started_event_id = task.started_event_id;

        let outcome = AssertUnwindSafe(async { self.handle_impl(task) })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(
                    started_event_id,
                    workflow_execution = ?workflow_execution,
                    error = %e,
                    "decision task failure; if this repeats the workflow might be stuck"
                );
                Self::failed_task(task_token, format!("workflow task failure: {e}"))
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!(
                    started_event_id,
                    workflow_execution = ?workflow_execution,
                    panic = %message,
                    "workflow panicked during decision task"
                );
                Self::failed_task(task_token, format!("workflow panic: {message}"))
            }
        }
    }

    fn handle_impl(&self, task: PollForDecisionTaskResponse) -> EngineResult<DecisionTaskResult> {
        let mut cursor = HistoryCursor::new(task)?;
        let mut decider = self.create_decider(&cursor)?;

        if let Some(query) = cursor.query().cloned() {
            let task_token = cursor.task_token().to_vec();
            // The whole query pass is localized: replay errors, handler
            // errors, and panics all become a failed-query result, never a
            // failed task.
            let answer = std::panic::catch_unwind(AssertUnwindSafe(|| {
                Self::replay_all(&mut decider, &mut cursor)?;
                decider.query(&query)
            }));

            let request = match answer {
                Ok(Ok(result)) => RespondQueryTaskCompletedRequest {
                    task_token,
                    completed_type: QueryTaskCompletedType::Completed,
                    query_result: Some(result),
                    error_message: None,
                },
                Ok(Err(e)) => RespondQueryTaskCompletedRequest {
                    task_token,
                    completed_type: QueryTaskCompletedType::Failed,
                    query_result: None,
                    error_message: Some(e.to_string()),
                },
                Err(payload) => RespondQueryTaskCompletedRequest {
                    task_token,
                    completed_type: QueryTaskCompletedType::Failed,
                    query_result: None,
                    error_message: Some(panic_message(payload)),
                },
            };
            Ok(DecisionTaskResult::QueryCompleted(request))
        } else {
            Self::replay_all(&mut decider, &mut cursor)?;
            let (decisions, execution_context) = decider.take_decisions()?;
            debug!(
                started_event_id = cursor.started_event_id(),
                workflow_id = %cursor.workflow_execution().workflow_id,
                run_id = %cursor.workflow_execution().run_id,
                decision_count = decisions.len(),
                "decision task completed"
            );
            Ok(DecisionTaskResult::Completed(
                RespondDecisionTaskCompletedRequest {
                    task_token: cursor.task_token().to_vec(),
                    decisions,
                    execution_context,
                },
            ))
        }
    }

    fn replay_all(decider: &mut ReplayDecider, cursor: &mut HistoryCursor) -> EngineResult<()> {
        while let Some(batch) = cursor.next_batch()? {
            decider.decide(batch)?;
        }
        Ok(())
    }

    fn create_decider(&self, cursor: &HistoryCursor) -> EngineResult<ReplayDecider> {
        let workflow = self.factory.create_workflow(cursor.workflow_type())?;
        let workflow_info = WorkflowInfo::new(
            cursor.workflow_execution().clone(),
            cursor.workflow_type().clone(),
        );
        ReplayDecider::new(workflow_info, workflow, cursor.execution_context())
    }

    fn failed_task(task_token: Vec<u8>, details: String) -> DecisionTaskResult {
        DecisionTaskResult::Failed(RespondDecisionTaskFailedRequest {
            task_token,
            details: Some(details.into_bytes()),
        })
    }

    /// Whether tasks for unrecognized workflow types should be left for
    /// another worker instance rather than failed.
    pub fn supports_unknown_types(&self) -> bool {
        self.factory.supports_unknown_types()
    }
}
