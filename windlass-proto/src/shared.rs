//! Shared types used across the Windlass protocol surface.
//!
//! History events are immutable, strictly ordered records assigned their
//! ids by the orchestration service; replay correctness depends on that
//! order being preserved exactly.

use serde::{Deserialize, Serialize};

/// Unique identifier for a workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// The workflow ID (user-defined or system-generated)
    pub workflow_id: String,
    /// The run ID (unique for each run of a workflow)
    pub run_id: String,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

/// Workflow type information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowType {
    pub name: String,
}

/// Activity type information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub name: String,
}

/// Represents a single event in workflow history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    /// Event timestamp in nanoseconds since the epoch, assigned by the service
    pub timestamp: i64,
    pub event_type: EventType,
    pub attributes: Option<EventAttributes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventType {
    WorkflowExecutionStarted = 0,
    WorkflowExecutionCompleted = 1,
    WorkflowExecutionFailed = 2,
    DecisionTaskScheduled = 3,
    DecisionTaskStarted = 4,
    DecisionTaskCompleted = 5,
    ActivityTaskScheduled = 6,
    ActivityTaskStarted = 7,
    ActivityTaskCompleted = 8,
    ActivityTaskFailed = 9,
    TimerStarted = 10,
    TimerFired = 11,
    TimerCanceled = 12,
    WorkflowExecutionSignaled = 13,
    WorkflowExecutionCancelRequested = 14,
}

/// Attributes attached to a history event, one variant per event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventAttributes {
    WorkflowExecutionStarted(Box<WorkflowExecutionStartedEventAttributes>),
    DecisionTaskScheduled(Box<DecisionTaskScheduledEventAttributes>),
    DecisionTaskStarted(Box<DecisionTaskStartedEventAttributes>),
    DecisionTaskCompleted(Box<DecisionTaskCompletedEventAttributes>),
    ActivityTaskScheduled(Box<ActivityTaskScheduledEventAttributes>),
    ActivityTaskStarted(Box<ActivityTaskStartedEventAttributes>),
    ActivityTaskCompleted(Box<ActivityTaskCompletedEventAttributes>),
    ActivityTaskFailed(Box<ActivityTaskFailedEventAttributes>),
    TimerStarted(Box<TimerStartedEventAttributes>),
    TimerFired(Box<TimerFiredEventAttributes>),
    TimerCanceled(Box<TimerCanceledEventAttributes>),
    WorkflowExecutionSignaled(Box<WorkflowExecutionSignaledEventAttributes>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionStartedEventAttributes {
    pub workflow_type: Option<WorkflowType>,
    pub input: Vec<u8>,
    pub identity: String,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTaskScheduledEventAttributes {
    pub start_to_close_timeout_seconds: i32,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTaskStartedEventAttributes {
    pub scheduled_event_id: i64,
    pub identity: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTaskCompletedEventAttributes {
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTaskScheduledEventAttributes {
    pub activity_id: String,
    pub activity_type: Option<ActivityType>,
    pub input: Option<Vec<u8>>,
    pub schedule_to_close_timeout_seconds: Option<i32>,
    pub start_to_close_timeout_seconds: Option<i32>,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTaskStartedEventAttributes {
    pub scheduled_event_id: i64,
    pub identity: String,
    pub attempt: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTaskCompletedEventAttributes {
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
    pub result: Option<Vec<u8>>,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTaskFailedEventAttributes {
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
    pub reason: Option<String>,
    pub details: Option<Vec<u8>>,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStartedEventAttributes {
    pub timer_id: String,
    pub start_to_fire_timeout_seconds: i64,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerFiredEventAttributes {
    pub timer_id: String,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerCanceledEventAttributes {
    pub timer_id: String,
    pub started_event_id: i64,
    pub identity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionSignaledEventAttributes {
    pub signal_name: String,
    pub input: Option<Vec<u8>>,
    pub identity: String,
}

/// Ordered workflow history
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct History {
    pub events: Vec<HistoryEvent>,
}

/// An instruction emitted by a decide pass to advance a workflow.
///
/// Emission order is significant and duplicates are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_type: DecisionType,
    pub attributes: Option<DecisionAttributes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum DecisionType {
    ScheduleActivityTask = 0,
    StartTimer = 1,
    CancelTimer = 2,
    CompleteWorkflowExecution = 3,
    FailWorkflowExecution = 4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecisionAttributes {
    ScheduleActivityTask(Box<ScheduleActivityTaskDecisionAttributes>),
    StartTimer(Box<StartTimerDecisionAttributes>),
    CancelTimer(Box<CancelTimerDecisionAttributes>),
    CompleteWorkflowExecution(Box<CompleteWorkflowExecutionDecisionAttributes>),
    FailWorkflowExecution(Box<FailWorkflowExecutionDecisionAttributes>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleActivityTaskDecisionAttributes {
    pub activity_id: String,
    pub activity_type: Option<ActivityType>,
    pub input: Option<Vec<u8>>,
    pub schedule_to_close_timeout_seconds: Option<i32>,
    pub start_to_close_timeout_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTimerDecisionAttributes {
    pub timer_id: String,
    pub start_to_fire_timeout_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelTimerDecisionAttributes {
    pub timer_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteWorkflowExecutionDecisionAttributes {
    pub result: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailWorkflowExecutionDecisionAttributes {
    pub reason: String,
    pub details: Option<Vec<u8>>,
}

/// A read-only query embedded in a decision task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowQuery {
    pub query_type: String,
    pub query_args: Option<Vec<u8>>,
}

/// Completion status of a query task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum QueryTaskCompletedType {
    Completed = 0,
    Failed = 1,
}
