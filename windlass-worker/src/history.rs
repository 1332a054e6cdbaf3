//! Segmentation of workflow history into per-decision-task batches.
//!
//! The cursor is a lazy, single-pass, non-restartable walk over the task's
//! event history. It never reorders, filters, or drops events; replay
//! correctness depends on exact fidelity. Restarting replay means
//! re-acquiring the task from the service, not rewinding the cursor.

use windlass_core::{EngineError, EngineResult};
use windlass_proto::{
    EventType, HistoryEvent, PollForDecisionTaskResponse, WorkflowExecution, WorkflowQuery,
    WorkflowType,
};

/// The subsequence of history events belonging to one decision-task
/// boundary. Consumed exactly once by the replay decider.
#[derive(Debug)]
pub struct DecisionBatch {
    pub events: Vec<HistoryEvent>,
    /// True when the batch precedes the task's current started event: its
    /// decisions were already made by an earlier pass.
    pub replay: bool,
}

/// Walks a decision task's history, exposing the metadata needed to build
/// a decider and a response alongside the per-task event batches.
pub struct HistoryCursor {
    task_token: Vec<u8>,
    workflow_execution: WorkflowExecution,
    workflow_type: WorkflowType,
    started_event_id: i64,
    query: Option<WorkflowQuery>,
    execution_context: Option<Vec<u8>>,
    events: std::vec::IntoIter<HistoryEvent>,
    last_event_id: i64,
}

impl HistoryCursor {
    pub fn new(task: PollForDecisionTaskResponse) -> EngineResult<Self> {
        let history = task
            .history
            .ok_or_else(|| EngineError::MalformedTask("decision task carries no history".into()))?;
        let workflow_execution = task.workflow_execution.ok_or_else(|| {
            EngineError::MalformedTask("decision task carries no workflow execution".into())
        })?;
        let workflow_type = task.workflow_type.ok_or_else(|| {
            EngineError::MalformedTask("decision task carries no workflow type".into())
        })?;

        Ok(Self {
            task_token: task.task_token,
            workflow_execution,
            workflow_type,
            started_event_id: task.started_event_id,
            query: task.query,
            execution_context: task.execution_context,
            events: history.events.into_iter(),
            last_event_id: 0,
        })
    }

    pub fn task_token(&self) -> &[u8] {
        &self.task_token
    }

    pub fn workflow_execution(&self) -> &WorkflowExecution {
        &self.workflow_execution
    }

    pub fn workflow_type(&self) -> &WorkflowType {
        &self.workflow_type
    }

    pub fn started_event_id(&self) -> i64 {
        self.started_event_id
    }

    pub fn query(&self) -> Option<&WorkflowQuery> {
        self.query.as_ref()
    }

    pub fn execution_context(&self) -> Option<&[u8]> {
        self.execution_context.as_deref()
    }

    /// Produce the next batch, ending with (and including) the next
    /// decision-task-started event, or with the final event of the
    /// history. Returns None once the history is exhausted.
    pub fn next_batch(&mut self) -> EngineResult<Option<DecisionBatch>> {
        let mut events = Vec::new();
        let mut boundary_event_id = None;

        for event in self.events.by_ref() {
            if event.event_id <= self.last_event_id {
                return Err(EngineError::MalformedTask(format!(
                    "history event ids must be strictly increasing: saw {} after {}",
                    event.event_id, self.last_event_id
                )));
            }
            self.last_event_id = event.event_id;

            let is_boundary = event.event_type == EventType::DecisionTaskStarted;
            if is_boundary {
                boundary_event_id = Some(event.event_id);
            }
            events.push(event);
            if is_boundary {
                break;
            }
        }

        if events.is_empty() {
            return Ok(None);
        }

        let replay = match boundary_event_id {
            Some(id) => id < self.started_event_id,
            None => false,
        };
        Ok(Some(DecisionBatch { events, replay }))
    }
}
