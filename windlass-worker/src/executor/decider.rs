//! Replay-driven decision production for one workflow instance.
//!
//! The decider owns the workflow's logical threads. `decide` replays one
//! history batch and drives the threads until they are all blocked on
//! events not yet in history (or the workflow completes), routing new
//! decisions into the accumulator. `query` answers read-only queries
//! against the replayed state without touching the accumulator.

use crate::executor::replay::{EventOutcome, OperationId, OperationKind, ReplayState};
use crate::history::DecisionBatch;
use crate::registry::WorkflowDefinition;
use futures::future::poll_fn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::Poll;
use tracing::debug;
use windlass_core::{panic_message, EngineError, EngineResult, WorkflowInfo};
use windlass_proto::{
    ActivityType, CancelTimerDecisionAttributes, CompleteWorkflowExecutionDecisionAttributes,
    Decision, DecisionAttributes, DecisionType, FailWorkflowExecutionDecisionAttributes,
    ScheduleActivityTaskDecisionAttributes, StartTimerDecisionAttributes, WorkflowQuery,
};
use windlass_workflow::commands::{ScheduleActivityCommand, StartTimerCommand};
use windlass_workflow::{
    CommandSink, DecisionAccumulator, Dispatcher, LogicalThread, OperationFuture, QueryHandlers,
    SignalBuffers, WorkflowCommand, WorkflowContext, WorkflowError,
};

/// SDK-internal record round-tripped between decision tasks as the
/// execution context blob.
#[derive(Debug, Serialize, Deserialize)]
struct StickyContext {
    last_processed_event_id: i64,
}

/// Routes workflow commands against replay state: outcomes already in
/// history resolve immediately, in-flight operations stay pending, and
/// genuinely new operations become decisions.
struct ReplayCommandSink {
    state: Arc<Mutex<ReplayState>>,
    accumulator: Arc<Mutex<DecisionAccumulator>>,
}

impl ReplayCommandSink {
    fn emit(
        accumulator: &Arc<Mutex<DecisionAccumulator>>,
        decision: Decision,
    ) -> Result<(), WorkflowError> {
        accumulator
            .lock()
            .unwrap()
            .emit(decision)
            .map_err(|e| WorkflowError::Generic(e.to_string()))
    }
}

fn outcome_to_result(outcome: EventOutcome) -> Result<Vec<u8>, WorkflowError> {
    match outcome {
        EventOutcome::Completed(data) => Ok(data),
        EventOutcome::Failed { reason } => Err(WorkflowError::ActivityFailed(reason)),
        EventOutcome::Canceled => Err(WorkflowError::Canceled),
    }
}

impl CommandSink for ReplayCommandSink {
    fn submit(&self, command: WorkflowCommand) -> OperationFuture {
        let state = self.state.clone();
        let accumulator = self.accumulator.clone();

        Box::pin(async move {
            match command {
                WorkflowCommand::ScheduleActivity(cmd) => {
                    let needs_decision = {
                        let state = state.lock().unwrap();
                        state.activity_result(&cmd.activity_id).is_none()
                            && !state.is_activity_scheduled(&cmd.activity_id)
                    };
                    if needs_decision {
                        Self::emit(&accumulator, schedule_activity_decision(&cmd))?;
                    }
                    // Parks the logical thread until the outcome shows up
                    // in replayed history; each dispatcher round re-checks.
                    let outcome = poll_fn(|_cx| {
                        match state.lock().unwrap().activity_result(&cmd.activity_id) {
                            Some(outcome) => Poll::Ready(outcome),
                            None => Poll::Pending,
                        }
                    })
                    .await;
                    outcome_to_result(outcome)
                }
                WorkflowCommand::StartTimer(cmd) => {
                    let needs_decision = {
                        let state = state.lock().unwrap();
                        state.timer_result(&cmd.timer_id).is_none()
                            && !state.is_timer_started(&cmd.timer_id)
                    };
                    if needs_decision {
                        Self::emit(&accumulator, start_timer_decision(&cmd))?;
                    }
                    let outcome = poll_fn(|_cx| {
                        match state.lock().unwrap().timer_result(&cmd.timer_id) {
                            Some(outcome) => Poll::Ready(outcome),
                            None => Poll::Pending,
                        }
                    })
                    .await;
                    outcome_to_result(outcome)
                }
                WorkflowCommand::CancelTimer(cmd) => {
                    Self::emit(
                        &accumulator,
                        Decision {
                            decision_type: DecisionType::CancelTimer,
                            attributes: Some(DecisionAttributes::CancelTimer(Box::new(
                                CancelTimerDecisionAttributes {
                                    timer_id: cmd.timer_id,
                                },
                            ))),
                        },
                    )?;
                    Ok(Vec::new())
                }
            }
        })
    }
}

fn schedule_activity_decision(cmd: &ScheduleActivityCommand) -> Decision {
    Decision {
        decision_type: DecisionType::ScheduleActivityTask,
        attributes: Some(DecisionAttributes::ScheduleActivityTask(Box::new(
            ScheduleActivityTaskDecisionAttributes {
                activity_id: cmd.activity_id.clone(),
                activity_type: Some(ActivityType {
                    name: cmd.activity_type.clone(),
                }),
                input: cmd.args.clone(),
                schedule_to_close_timeout_seconds: Some(
                    cmd.options.schedule_to_close_timeout.as_secs() as i32,
                ),
                start_to_close_timeout_seconds: Some(
                    cmd.options.start_to_close_timeout.as_secs() as i32
                ),
            },
        ))),
    }
}

fn decision_matches_operation(decision: &Decision, operation: &OperationId) -> bool {
    match (&decision.attributes, operation.kind) {
        (Some(DecisionAttributes::ScheduleActivityTask(attrs)), OperationKind::Activity) => {
            attrs.activity_id == operation.id
        }
        (Some(DecisionAttributes::StartTimer(attrs)), OperationKind::Timer) => {
            attrs.timer_id == operation.id
        }
        _ => false,
    }
}

fn start_timer_decision(cmd: &StartTimerCommand) -> Decision {
    Decision {
        decision_type: DecisionType::StartTimer,
        attributes: Some(DecisionAttributes::StartTimer(Box::new(
            StartTimerDecisionAttributes {
                timer_id: cmd.timer_id.clone(),
                start_to_fire_timeout_seconds: cmd.duration.as_secs() as i64,
            },
        ))),
    }
}

/// Owns one workflow instance's logical execution across the decision
/// tasks of a single handler invocation.
pub struct ReplayDecider {
    context: WorkflowContext,
    dispatcher: Arc<Mutex<Dispatcher>>,
    state: Arc<Mutex<ReplayState>>,
    accumulator: Arc<Mutex<DecisionAccumulator>>,
    query_handlers: QueryHandlers,
    workflow: Option<Box<dyn WorkflowDefinition>>,
    root_thread_id: Option<u64>,
    completed: bool,
}

impl ReplayDecider {
    pub fn new(
        workflow_info: WorkflowInfo,
        workflow: Box<dyn WorkflowDefinition>,
        previous_context: Option<&[u8]>,
    ) -> EngineResult<Self> {
        let signals: SignalBuffers = Arc::new(Mutex::new(HashMap::new()));
        let state = Arc::new(Mutex::new(ReplayState::new(signals.clone())));

        if let Some(blob) = previous_context {
            // The blob is opaque to the service but not to us; reject
            // anything we did not write ourselves.
            let sticky: StickyContext = serde_json::from_slice(blob).map_err(|e| {
                EngineError::Serialization(format!("invalid execution context blob: {e}"))
            })?;
            debug!(
                last_processed_event_id = sticky.last_processed_event_id,
                "resuming from previous decide pass"
            );
        }

        let accumulator = Arc::new(Mutex::new(DecisionAccumulator::new()));
        let sink = Arc::new(ReplayCommandSink {
            state: state.clone(),
            accumulator: accumulator.clone(),
        });
        let query_handlers: QueryHandlers = Arc::new(Mutex::new(HashMap::new()));
        let context =
            WorkflowContext::with_sink(workflow_info, sink, signals, query_handlers.clone());
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new()));
        context.set_spawn_handle(dispatcher.lock().unwrap().handle());

        Ok(Self {
            context,
            dispatcher,
            state,
            accumulator,
            query_handlers,
            workflow: Some(workflow),
            root_thread_id: None,
            completed: false,
        })
    }

    /// Replay one batch of history and drive every logical thread until
    /// all are blocked or the workflow completes. Deterministic: identical
    /// history always yields identical decisions in identical order.
    pub fn decide(&mut self, batch: DecisionBatch) -> EngineResult<()> {
        let opened = {
            let mut state = self.state.lock().unwrap();
            let opened = state.apply_batch(&batch.events);
            self.context.set_current_time_nanos(state.current_time_nanos());
            self.context.set_cancel_requested(state.cancel_requested());
            opened
        };
        self.retire_replayed(&opened);
        self.context.set_replaying(batch.replay);

        if let Some(workflow) = self.workflow.take() {
            let input = self.state.lock().unwrap().workflow_input();
            let future = workflow.execute(self.context.clone(), input);
            let mut dispatcher = self.dispatcher.lock().unwrap();
            let id = dispatcher.next_thread_id();
            dispatcher.spawn(LogicalThread::new(id, "workflow-root", future));
            self.root_thread_id = Some(id);
        }

        let root_done = {
            let mut dispatcher = self.dispatcher.lock().unwrap();
            dispatcher
                .run_until_all_blocked()
                .map_err(|e| EngineError::Other(e.to_string()))?;
            self.root_thread_id
                .map(|id| dispatcher.is_thread_done(id))
                .unwrap_or(false)
        };

        if root_done && !self.completed {
            self.completed = true;
            self.emit_completion_decision()?;
        }
        Ok(())
    }

    /// History now records these operations as scheduled, so decisions a
    /// previous pass produced for them must not be sent again.
    fn retire_replayed(&self, opened: &[OperationId]) {
        if opened.is_empty() {
            return;
        }
        let mut accumulator = self.accumulator.lock().unwrap();
        for operation in opened {
            let retired = accumulator.retire(|d| decision_matches_operation(d, operation));
            if retired {
                debug!(operation = ?operation, "retired decision already recorded in history");
            }
        }
    }

    fn emit_completion_decision(&mut self) -> EngineResult<()> {
        let root_id = self
            .root_thread_id
            .ok_or_else(|| EngineError::Other("workflow root thread was never started".into()))?;
        let result = self
            .dispatcher
            .lock()
            .unwrap()
            .take_result(root_id)
            .ok_or_else(|| EngineError::Other("workflow root result missing".into()))?;
        let result = result
            .downcast::<Result<Vec<u8>, WorkflowError>>()
            .map_err(|_| EngineError::Other("workflow returned an unexpected result type".into()))?;

        let decision = match *result {
            Ok(output) => Decision {
                decision_type: DecisionType::CompleteWorkflowExecution,
                attributes: Some(DecisionAttributes::CompleteWorkflowExecution(Box::new(
                    CompleteWorkflowExecutionDecisionAttributes {
                        result: Some(output),
                    },
                ))),
            },
            Err(e) => Decision {
                decision_type: DecisionType::FailWorkflowExecution,
                attributes: Some(DecisionAttributes::FailWorkflowExecution(Box::new(
                    FailWorkflowExecutionDecisionAttributes {
                        reason: e.to_string(),
                        details: None,
                    },
                ))),
            },
        };

        self.accumulator
            .lock()
            .unwrap()
            .emit(decision)
            .map_err(|e| EngineError::Contract(e.to_string()))
    }

    /// Execute a read-only query against the replayed state. Failures
    /// (unknown query type, handler error, handler panic) surface as
    /// errors for the handler to package; they never fail the task and
    /// never touch the accumulator.
    pub fn query(&self, query: &WorkflowQuery) -> EngineResult<Vec<u8>> {
        let handlers = self.query_handlers.lock().unwrap();
        let handler = handlers.get(&query.query_type).ok_or_else(|| {
            EngineError::QueryFailed(format!("unknown query type: {}", query.query_type))
        })?;

        let args = query.query_args.clone();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(args)));
        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(EngineError::QueryFailed(e.to_string())),
            Err(payload) => Err(EngineError::QueryFailed(format!(
                "query handler panicked: {}",
                panic_message(payload)
            ))),
        }
    }

    /// Finalize the decide pass: seal the accumulator and hand back the
    /// ordered decisions plus the context blob for the next task.
    pub fn take_decisions(&mut self) -> EngineResult<(Vec<Decision>, Option<Vec<u8>>)> {
        let blob = {
            let state = self.state.lock().unwrap();
            serde_json::to_vec(&StickyContext {
                last_processed_event_id: state.last_processed_event_id(),
            })
            .map_err(|e| EngineError::Serialization(e.to_string()))?
        };

        let mut accumulator = self.accumulator.lock().unwrap();
        accumulator
            .set_execution_context(blob)
            .map_err(|e| EngineError::Contract(e.to_string()))?;
        Ok(accumulator.seal())
    }
}
