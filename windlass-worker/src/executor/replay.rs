//! Replay bookkeeping for one workflow instance.
//!
//! `ReplayState` records what history says already happened: operation
//! outcomes keyed by their scheduling event, operations still in flight,
//! buffered signals, cancellation, and the timestamps workflow-visible
//! time is derived from. The command sink consults it to decide whether a
//! submitted command resolves from history or becomes a new decision.

use std::collections::HashMap;
use tracing::{debug, warn};
use windlass_proto::{EventAttributes, EventType, HistoryEvent};
use windlass_workflow::SignalBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Activity,
    Timer,
}

/// Identifies one deferred operation issued by workflow code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationId {
    pub kind: OperationKind,
    pub id: String,
}

/// Outcome of an operation as recorded in history
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Completed(Vec<u8>),
    Failed { reason: String },
    Canceled,
}

pub struct ReplayState {
    event_results: HashMap<i64, EventOutcome>,
    open_operations: HashMap<i64, OperationId>,
    signals: SignalBuffers,
    cancel_requested: bool,
    last_processed_event_id: i64,
    workflow_start_time_nanos: Option<i64>,
    decision_task_time_nanos: Option<i64>,
    workflow_input: Option<Vec<u8>>,
}

impl ReplayState {
    pub fn new(signals: SignalBuffers) -> Self {
        Self {
            event_results: HashMap::new(),
            open_operations: HashMap::new(),
            signals,
            cancel_requested: false,
            last_processed_event_id: 0,
            workflow_start_time_nanos: None,
            decision_task_time_nanos: None,
            workflow_input: None,
        }
    }

    /// Apply a batch of history events in source order. Events at or below
    /// the high-water mark were already applied to this state and are
    /// skipped, so overlapping batches are a no-op.
    ///
    /// Returns the operations newly opened by this batch, so the decider
    /// can retire decisions a previous pass already sent for them.
    pub fn apply_batch(&mut self, events: &[HistoryEvent]) -> Vec<OperationId> {
        let mut opened = Vec::new();
        for event in events {
            if event.event_id > self.last_processed_event_id {
                if let Some(operation) = self.apply(event) {
                    opened.push(operation);
                }
                self.last_processed_event_id = event.event_id;
            }
        }
        opened
    }

    fn apply(&mut self, event: &HistoryEvent) -> Option<OperationId> {
        debug!(
            event_id = event.event_id,
            event_type = ?event.event_type,
            "replaying event"
        );
        let mut opened = None;
        match event.event_type {
            EventType::WorkflowExecutionStarted => {
                self.workflow_start_time_nanos = Some(event.timestamp);
                if let Some(EventAttributes::WorkflowExecutionStarted(attrs)) = &event.attributes {
                    if !attrs.input.is_empty() {
                        self.workflow_input = Some(attrs.input.clone());
                    }
                } else {
                    warn!(
                        event_id = event.event_id,
                        "workflow-started event missing attributes"
                    );
                }
            }
            EventType::DecisionTaskStarted => {
                self.decision_task_time_nanos = Some(event.timestamp);
            }
            EventType::ActivityTaskScheduled => {
                if let Some(EventAttributes::ActivityTaskScheduled(attrs)) = &event.attributes {
                    let operation = OperationId {
                        kind: OperationKind::Activity,
                        id: attrs.activity_id.clone(),
                    };
                    self.open_operations.insert(event.event_id, operation.clone());
                    opened = Some(operation);
                } else {
                    warn!(
                        event_id = event.event_id,
                        "activity-scheduled event missing attributes"
                    );
                }
            }
            EventType::ActivityTaskCompleted => {
                if let Some(EventAttributes::ActivityTaskCompleted(attrs)) = &event.attributes {
                    self.event_results.insert(
                        attrs.scheduled_event_id,
                        EventOutcome::Completed(attrs.result.clone().unwrap_or_default()),
                    );
                }
            }
            EventType::ActivityTaskFailed => {
                if let Some(EventAttributes::ActivityTaskFailed(attrs)) = &event.attributes {
                    self.event_results.insert(
                        attrs.scheduled_event_id,
                        EventOutcome::Failed {
                            reason: attrs.reason.clone().unwrap_or_default(),
                        },
                    );
                }
            }
            EventType::TimerStarted => {
                if let Some(EventAttributes::TimerStarted(attrs)) = &event.attributes {
                    let operation = OperationId {
                        kind: OperationKind::Timer,
                        id: attrs.timer_id.clone(),
                    };
                    self.open_operations.insert(event.event_id, operation.clone());
                    opened = Some(operation);
                }
            }
            EventType::TimerFired => {
                if let Some(EventAttributes::TimerFired(attrs)) = &event.attributes {
                    self.event_results
                        .insert(attrs.started_event_id, EventOutcome::Completed(Vec::new()));
                }
            }
            EventType::TimerCanceled => {
                if let Some(EventAttributes::TimerCanceled(attrs)) = &event.attributes {
                    self.event_results
                        .insert(attrs.started_event_id, EventOutcome::Canceled);
                }
            }
            EventType::WorkflowExecutionSignaled => {
                if let Some(EventAttributes::WorkflowExecutionSignaled(attrs)) = &event.attributes {
                    let mut signals = self.signals.lock().unwrap();
                    signals
                        .entry(attrs.signal_name.clone())
                        .or_default()
                        .push_back(attrs.input.clone().unwrap_or_default());
                }
            }
            EventType::WorkflowExecutionCancelRequested => {
                self.cancel_requested = true;
            }
            _ => {}
        }
        opened
    }

    fn find_result(&self, kind: OperationKind, id: &str) -> Option<&EventOutcome> {
        for (event_id, operation) in &self.open_operations {
            if operation.kind == kind && operation.id == id {
                return self.event_results.get(event_id);
            }
        }
        None
    }

    pub fn activity_result(&self, activity_id: &str) -> Option<EventOutcome> {
        self.find_result(OperationKind::Activity, activity_id).cloned()
    }

    pub fn timer_result(&self, timer_id: &str) -> Option<EventOutcome> {
        self.find_result(OperationKind::Timer, timer_id).cloned()
    }

    /// True when history shows this activity was already scheduled; a
    /// matching schedule command must not emit a duplicate decision.
    pub fn is_activity_scheduled(&self, activity_id: &str) -> bool {
        self.open_operations
            .values()
            .any(|op| op.kind == OperationKind::Activity && op.id == activity_id)
    }

    pub fn is_timer_started(&self, timer_id: &str) -> bool {
        self.open_operations
            .values()
            .any(|op| op.kind == OperationKind::Timer && op.id == timer_id)
    }

    pub fn workflow_input(&self) -> Option<Vec<u8>> {
        self.workflow_input.clone()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn last_processed_event_id(&self) -> i64 {
        self.last_processed_event_id
    }

    /// Deterministic "now" for workflow code: the latest decision-task
    /// start, falling back to the workflow start.
    pub fn current_time_nanos(&self) -> i64 {
        self.decision_task_time_nanos
            .or(self.workflow_start_time_nanos)
            .unwrap_or(0)
    }
}
