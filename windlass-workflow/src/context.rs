//! Workflow context and core functions for authoring workflows.
//!
//! This module provides the API workflow code runs against: scheduling
//! activities and timers, consuming signals, registering query handlers,
//! spawning logical threads, and capturing stub calls as futures.

use crate::commands::{
    CancelTimerCommand, ScheduleActivityCommand, StartTimerCommand, WorkflowCommand,
};
use crate::dispatch::{AsyncDispatchContext, DispatchError};
use crate::dispatcher::{JoinFuture, LogicalThread, SpawnHandle};
use crate::future::{OperationFuture, WorkflowError};
use futures::future::poll_fn;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use std::time::Duration;
use windlass_core::{ActivityOptions, WorkflowInfo};

/// Type alias for query handlers registered by workflow code
pub type QueryHandler = Box<dyn Fn(Option<Vec<u8>>) -> Result<Vec<u8>, WorkflowError> + Send + Sync>;

/// Shared map of buffered signal payloads, keyed by signal name
pub type SignalBuffers = Arc<Mutex<HashMap<String, VecDeque<Vec<u8>>>>>;

/// Shared map of query handlers
pub type QueryHandlers = Arc<Mutex<HashMap<String, QueryHandler>>>;

/// Trait for handling workflow commands (implemented by the replay decider)
pub trait CommandSink: Send + Sync {
    fn submit(&self, command: WorkflowCommand) -> OperationFuture;
}

/// No-op command sink for contexts built outside a decider
struct NoopCommandSink;

impl CommandSink for NoopCommandSink {
    fn submit(&self, _command: WorkflowCommand) -> OperationFuture {
        Box::pin(async { Err(WorkflowError::Generic("no command sink configured".into())) })
    }
}

/// Workflow context for executing workflow logic.
///
/// One instance per logical thread: clones created through `spawn` share
/// replay state (signals, time, sequence counter) but carry their own
/// async dispatch context, so captures never cross logical threads.
pub struct WorkflowContext {
    workflow_info: WorkflowInfo,
    command_sink: Arc<dyn CommandSink>,
    sequence: Arc<AtomicU64>,
    signals: SignalBuffers,
    query_handlers: QueryHandlers,
    cancel_requested: Arc<AtomicBool>,
    current_time_nanos: Arc<AtomicI64>,
    replaying: Arc<AtomicBool>,
    dispatch: Arc<Mutex<AsyncDispatchContext>>,
    spawner: Arc<Mutex<Option<SpawnHandle>>>,
}

impl Clone for WorkflowContext {
    fn clone(&self) -> Self {
        Self {
            workflow_info: self.workflow_info.clone(),
            command_sink: self.command_sink.clone(),
            sequence: self.sequence.clone(),
            signals: self.signals.clone(),
            query_handlers: self.query_handlers.clone(),
            cancel_requested: self.cancel_requested.clone(),
            current_time_nanos: self.current_time_nanos.clone(),
            replaying: self.replaying.clone(),
            dispatch: self.dispatch.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl WorkflowContext {
    pub fn new(workflow_info: WorkflowInfo) -> Self {
        Self::with_sink(
            workflow_info,
            Arc::new(NoopCommandSink),
            Arc::new(Mutex::new(HashMap::new())),
            Arc::new(Mutex::new(HashMap::new())),
        )
    }

    pub fn with_sink(
        workflow_info: WorkflowInfo,
        sink: Arc<dyn CommandSink>,
        signals: SignalBuffers,
        query_handlers: QueryHandlers,
    ) -> Self {
        Self {
            workflow_info,
            command_sink: sink,
            sequence: Arc::new(AtomicU64::new(0)),
            signals,
            query_handlers,
            cancel_requested: Arc::new(AtomicBool::new(false)),
            current_time_nanos: Arc::new(AtomicI64::new(0)),
            replaying: Arc::new(AtomicBool::new(false)),
            dispatch: Arc::new(Mutex::new(AsyncDispatchContext::new())),
            spawner: Arc::new(Mutex::new(None)),
        }
    }

    /// Context for a freshly spawned logical thread: shared replay state,
    /// independent dispatch slot.
    fn for_new_logical_thread(&self) -> Self {
        let mut ctx = self.clone();
        ctx.dispatch = Arc::new(Mutex::new(AsyncDispatchContext::new()));
        ctx
    }

    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{seq}")
    }

    /// Get workflow information
    pub fn workflow_info(&self) -> &WorkflowInfo {
        &self.workflow_info
    }

    /// Submit a command through the sink, honoring an active capture
    /// block: inside a capture the real future is recorded on the dispatch
    /// context and the caller receives a placeholder.
    fn submit(&self, command: WorkflowCommand) -> OperationFuture {
        let future = self.command_sink.submit(command);
        let mut dispatch = self.dispatch.lock().unwrap();
        if dispatch.is_capturing() {
            if let Err(e) = dispatch.record_result(future) {
                // A second stub call inside one capture block is a bug in
                // the workflow code; fail loudly rather than overwrite.
                panic!("async capture misuse: {e}");
            }
            Box::pin(async { Ok(Vec::new()) })
        } else {
            future
        }
    }

    /// Schedule an activity. Awaiting the returned future suspends the
    /// logical thread until the activity's outcome is in history.
    pub fn execute_activity(
        &self,
        activity_type: &str,
        args: Option<Vec<u8>>,
        options: ActivityOptions,
    ) -> OperationFuture {
        let activity_id = self.next_id();
        self.submit(WorkflowCommand::ScheduleActivity(ScheduleActivityCommand {
            activity_id,
            activity_type: activity_type.to_string(),
            args,
            options,
        }))
    }

    /// Start a timer, returning its id alongside the future so the timer
    /// can be canceled later.
    pub fn start_timer(&self, duration: Duration) -> (String, OperationFuture) {
        let timer_id = self.next_id();
        let future = self.submit(WorkflowCommand::StartTimer(StartTimerCommand {
            timer_id: timer_id.clone(),
            duration,
        }));
        (timer_id, future)
    }

    /// Cancel a previously started timer
    pub fn cancel_timer(&self, timer_id: &str) -> OperationFuture {
        self.submit(WorkflowCommand::CancelTimer(CancelTimerCommand {
            timer_id: timer_id.to_string(),
        }))
    }

    /// Sleep for a duration (workflow-aware)
    pub async fn sleep(&self, duration: Duration) {
        let (_, future) = self.start_timer(duration);
        let _ = future.await;
    }

    /// Begin an asynchronous capture on this logical thread. The next stub
    /// call records its future instead of handing it to the caller.
    pub fn begin_capture(&self) -> Result<(), DispatchError> {
        self.dispatch.lock().unwrap().begin_capture()
    }

    /// End the capture, retrieving the recorded future
    pub fn end_capture(&self) -> Result<OperationFuture, DispatchError> {
        self.dispatch.lock().unwrap().end_capture()
    }

    /// Capture a single stub call as a future: `call` runs with a capture
    /// active and must make exactly one stub invocation.
    pub fn capture<F>(&self, call: F) -> Result<OperationFuture, DispatchError>
    where
        F: FnOnce(&WorkflowContext),
    {
        self.begin_capture()?;
        call(self);
        self.end_capture()
    }

    /// Spawn a new logical thread. The closure receives the thread's own
    /// context; the returned join future resolves to the thread's result.
    pub fn spawn<F, Fut, T>(&self, name: &str, f: F) -> JoinFuture<T>
    where
        F: FnOnce(WorkflowContext) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let spawner = self
            .spawner
            .lock()
            .unwrap()
            .clone()
            // Contexts handed to workflow code always carry a spawn
            // handle; spawning outside a decider is a programming error.
            .unwrap_or_else(|| panic!("workflow context has no dispatcher"));

        let future = f(self.for_new_logical_thread());
        let id = spawner.next_thread_id();
        spawner.spawn(LogicalThread::new(id, name, future));
        JoinFuture::new(id, spawner.results_handle())
    }

    pub fn set_spawn_handle(&self, handle: SpawnHandle) {
        *self.spawner.lock().unwrap() = Some(handle);
    }

    /// Get a signal channel for receiving signals
    pub fn signal_channel(&self, signal_name: &str) -> SignalChannel {
        SignalChannel::new(signal_name, self.signals.clone())
    }

    /// Set a query handler
    pub fn set_query_handler<F>(&self, query_type: &str, handler: F)
    where
        F: Fn(Option<Vec<u8>>) -> Result<Vec<u8>, WorkflowError> + Send + Sync + 'static,
    {
        let mut handlers = self.query_handlers.lock().unwrap();
        handlers.insert(query_type.to_string(), Box::new(handler));
    }

    /// Current workflow time, derived from history event timestamps.
    /// Identical across replays of the same history.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        let nanos = self.current_time_nanos.load(Ordering::Relaxed);
        chrono::DateTime::from_timestamp(nanos / 1_000_000_000, (nanos % 1_000_000_000) as u32)
            .unwrap_or_default()
    }

    pub fn set_current_time_nanos(&self, nanos: i64) {
        self.current_time_nanos.store(nanos, Ordering::Relaxed);
    }

    /// True while replaying events the service has already seen decisions
    /// for
    pub fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::Relaxed)
    }

    pub fn set_replaying(&self, replaying: bool) {
        self.replaying.store(replaying, Ordering::Relaxed);
    }

    /// Check whether cancellation of this workflow was requested
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Relaxed)
    }

    pub fn set_cancel_requested(&self, requested: bool) {
        self.cancel_requested.store(requested, Ordering::Relaxed);
    }
}

/// Signal channel for receiving signals in the order they were recorded
/// in history
pub struct SignalChannel {
    signal_name: String,
    signals: SignalBuffers,
}

impl SignalChannel {
    pub fn new(signal_name: &str, signals: SignalBuffers) -> Self {
        Self {
            signal_name: signal_name.to_string(),
            signals,
        }
    }

    /// Receive the next buffered signal payload, suspending the logical
    /// thread while none is available.
    pub async fn recv(&mut self) -> Vec<u8> {
        poll_fn(|_cx| {
            let mut signals = self.signals.lock().unwrap();
            if let Some(queue) = signals.get_mut(&self.signal_name) {
                if let Some(payload) = queue.pop_front() {
                    return Poll::Ready(payload);
                }
            }
            Poll::Pending
        })
        .await
    }

    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        let mut signals = self.signals.lock().unwrap();
        signals
            .get_mut(&self.signal_name)
            .and_then(|queue| queue.pop_front())
    }
}
