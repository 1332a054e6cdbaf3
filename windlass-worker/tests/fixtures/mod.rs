//! History fixtures shared by the integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use windlass_proto::{
    ActivityTaskCompletedEventAttributes, ActivityTaskFailedEventAttributes,
    ActivityTaskScheduledEventAttributes, DecisionTaskStartedEventAttributes, EventAttributes,
    EventType, History, HistoryEvent, PollForDecisionTaskResponse, TimerFiredEventAttributes,
    TimerStartedEventAttributes, WorkflowExecution, WorkflowExecutionSignaledEventAttributes,
    WorkflowExecutionStartedEventAttributes, WorkflowQuery, WorkflowType,
};
use windlass_workflow::{WorkflowContext, WorkflowError};

/// Workflow definition built from a closure, for test bodies
#[derive(Clone)]
pub struct ClosureWorkflow<F>(pub F)
where
    F: Fn(
            WorkflowContext,
            Option<Vec<u8>>,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>
        + Send
        + Sync
        + Clone;

impl<F> windlass_worker::WorkflowDefinition for ClosureWorkflow<F>
where
    F: Fn(
            WorkflowContext,
            Option<Vec<u8>>,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>
        + Send
        + Sync
        + Clone
        + 'static,
{
    fn execute(
        &self,
        ctx: WorkflowContext,
        input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        (self.0)(ctx, input)
    }
}

pub fn event(id: i64, event_type: EventType) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type,
        attributes: None,
    }
}

pub fn started_event(id: i64, input: &[u8]) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::WorkflowExecutionStarted,
        attributes: Some(EventAttributes::WorkflowExecutionStarted(Box::new(
            WorkflowExecutionStartedEventAttributes {
                workflow_type: None,
                input: input.to_vec(),
                identity: "test".to_string(),
                attempt: 0,
            },
        ))),
    }
}

pub fn decision_started_at(id: i64, timestamp: i64) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp,
        event_type: EventType::DecisionTaskStarted,
        attributes: Some(EventAttributes::DecisionTaskStarted(Box::new(
            DecisionTaskStartedEventAttributes {
                scheduled_event_id: id - 1,
                identity: "test-worker".to_string(),
                request_id: format!("req-{id}"),
            },
        ))),
    }
}

pub fn activity_scheduled(id: i64, activity_id: &str) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::ActivityTaskScheduled,
        attributes: Some(EventAttributes::ActivityTaskScheduled(Box::new(
            ActivityTaskScheduledEventAttributes {
                activity_id: activity_id.to_string(),
                activity_type: None,
                input: None,
                schedule_to_close_timeout_seconds: None,
                start_to_close_timeout_seconds: None,
                decision_task_completed_event_id: id - 1,
            },
        ))),
    }
}

pub fn activity_completed(id: i64, scheduled_event_id: i64, result: &[u8]) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::ActivityTaskCompleted,
        attributes: Some(EventAttributes::ActivityTaskCompleted(Box::new(
            ActivityTaskCompletedEventAttributes {
                scheduled_event_id,
                started_event_id: 0,
                result: Some(result.to_vec()),
                identity: "test-worker".to_string(),
            },
        ))),
    }
}

pub fn activity_failed(id: i64, scheduled_event_id: i64, reason: &str) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::ActivityTaskFailed,
        attributes: Some(EventAttributes::ActivityTaskFailed(Box::new(
            ActivityTaskFailedEventAttributes {
                scheduled_event_id,
                started_event_id: 0,
                reason: Some(reason.to_string()),
                details: None,
                identity: "test-worker".to_string(),
            },
        ))),
    }
}

pub fn timer_started(id: i64, timer_id: &str) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::TimerStarted,
        attributes: Some(EventAttributes::TimerStarted(Box::new(
            TimerStartedEventAttributes {
                timer_id: timer_id.to_string(),
                start_to_fire_timeout_seconds: 60,
                decision_task_completed_event_id: id - 1,
            },
        ))),
    }
}

pub fn timer_fired(id: i64, started_event_id: i64, timer_id: &str) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::TimerFired,
        attributes: Some(EventAttributes::TimerFired(Box::new(
            TimerFiredEventAttributes {
                timer_id: timer_id.to_string(),
                started_event_id,
            },
        ))),
    }
}

pub fn signal_event(id: i64, signal_name: &str, payload: &[u8]) -> HistoryEvent {
    HistoryEvent {
        event_id: id,
        timestamp: 0,
        event_type: EventType::WorkflowExecutionSignaled,
        attributes: Some(EventAttributes::WorkflowExecutionSignaled(Box::new(
            WorkflowExecutionSignaledEventAttributes {
                signal_name: signal_name.to_string(),
                input: Some(payload.to_vec()),
                identity: "test".to_string(),
            },
        ))),
    }
}

/// Minimal history for a first decision task: workflow started, decision
/// task scheduled, decision task started.
pub fn base_history(input: &[u8]) -> Vec<HistoryEvent> {
    vec![
        started_event(1, input),
        event(2, EventType::DecisionTaskScheduled),
        decision_started_at(3, 0),
    ]
}

pub fn task_for(
    workflow_type: &str,
    token: &[u8],
    events: Vec<HistoryEvent>,
) -> PollForDecisionTaskResponse {
    let started_event_id = events
        .iter()
        .rev()
        .find(|e| e.event_type == EventType::DecisionTaskStarted)
        .map(|e| e.event_id)
        .unwrap_or(0);
    PollForDecisionTaskResponse {
        task_token: token.to_vec(),
        workflow_execution: Some(WorkflowExecution::new("wf-1", "run-1")),
        workflow_type: Some(WorkflowType {
            name: workflow_type.to_string(),
        }),
        previous_started_event_id: 0,
        started_event_id,
        attempt: 1,
        history: Some(History { events }),
        query: None,
        execution_context: None,
    }
}

pub fn with_query(
    mut task: PollForDecisionTaskResponse,
    query_type: &str,
) -> PollForDecisionTaskResponse {
    task.query = Some(WorkflowQuery {
        query_type: query_type.to_string(),
        query_args: None,
    });
    task
}
