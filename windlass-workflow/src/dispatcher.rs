//! Deterministic cooperative scheduler for workflow logical threads.
//!
//! The dispatcher polls logical threads in creation order until every
//! thread is blocked or done. Replay of identical history therefore
//! produces identical thread interleavings regardless of real scheduling
//! timing; suspension only happens at awaits on operation futures.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use tracing::trace;

/// Scheduling state of a logical thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Ready to be polled
    Runnable,
    /// Parked awaiting an event not yet in history
    Blocked,
    /// Finished; result stored with the dispatcher
    Done,
}

/// A cooperatively scheduled unit of workflow-code execution
pub struct LogicalThread {
    pub id: u64,
    /// Name for diagnostics
    pub name: String,
    future: Pin<Box<dyn Future<Output = Box<dyn Any + Send>> + Send>>,
    state: ThreadState,
}

impl LogicalThread {
    pub fn new<F, T>(id: u64, name: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        // Type-erase the output so threads of different result types can
        // live in one run queue.
        let boxed = Box::pin(async move {
            let result = future.await;
            Box::new(result) as Box<dyn Any + Send>
        });

        Self {
            id,
            name: name.into(),
            future: boxed,
            state: ThreadState::Runnable,
        }
    }

    fn poll(&mut self, waker: &Waker) -> Poll<Box<dyn Any + Send>> {
        let mut cx = Context::from_waker(waker);
        self.future.as_mut().poll(&mut cx)
    }
}

/// Dispatcher error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatcherError {
    #[error("dispatcher is already running")]
    AlreadyRunning,
    #[error("logical thread {0} not found")]
    ThreadNotFound(u64),
}

type ThreadResults = Arc<Mutex<HashMap<u64, Box<dyn Any + Send>>>>;

/// Deterministic scheduler over logical threads.
///
/// Threads spawned while a run is in progress go through a pending queue
/// (see [`SpawnHandle`]) and join the run queue, in spawn order, at the
/// start of the next iteration.
pub struct Dispatcher {
    threads: Vec<LogicalThread>,
    sequence: Arc<AtomicU64>,
    running: bool,
    results: ThreadResults,
    pending: Arc<Mutex<Vec<LogicalThread>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            threads: Vec::new(),
            sequence: Arc::new(AtomicU64::new(0)),
            running: false,
            results: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn next_thread_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    /// Handle through which workflow code spawns logical threads without
    /// holding the dispatcher itself (spawns may happen mid-run).
    pub fn handle(&self) -> SpawnHandle {
        SpawnHandle {
            sequence: self.sequence.clone(),
            pending: self.pending.clone(),
            results: self.results.clone(),
        }
    }

    /// Add a logical thread directly. While a run is in progress the
    /// thread is queued and picked up on the next iteration.
    pub fn spawn(&mut self, thread: LogicalThread) -> u64 {
        let id = thread.id;
        if self.running {
            self.pending.lock().unwrap().push(thread);
        } else {
            self.threads.push(thread);
        }
        id
    }

    pub fn is_thread_done(&self, thread_id: u64) -> bool {
        self.results.lock().unwrap().contains_key(&thread_id)
    }

    /// Take the result of a finished logical thread
    pub fn take_result(&self, thread_id: u64) -> Option<Box<dyn Any + Send>> {
        self.results.lock().unwrap().remove(&thread_id)
    }

    /// Shared handle to the result map, used by join futures
    pub fn results_handle(&self) -> ThreadResults {
        self.results.clone()
    }

    /// Poll threads in creation order until no thread changes state.
    ///
    /// Blocked threads are re-polled each round since an earlier thread's
    /// progress (a consumed signal, a finished join target) may have
    /// unblocked them. Returns true when every thread is done.
    pub fn run_until_all_blocked(&mut self) -> Result<bool, DispatcherError> {
        if self.running {
            return Err(DispatcherError::AlreadyRunning);
        }
        self.running = true;

        // Manual polling with a no-op waker: wake-ups are driven by the
        // re-poll loop, never by the runtime.
        let waker = noop_waker();

        loop {
            {
                let mut pending = self.pending.lock().unwrap();
                if !pending.is_empty() {
                    trace!(count = pending.len(), "admitting spawned logical threads");
                    self.threads.append(&mut pending);
                }
            }

            let mut any_changed = false;

            for thread in &mut self.threads {
                match thread.state {
                    ThreadState::Done => continue,
                    ThreadState::Runnable | ThreadState::Blocked => match thread.poll(&waker) {
                        Poll::Ready(result) => {
                            trace!(id = thread.id, name = %thread.name, "logical thread done");
                            thread.state = ThreadState::Done;
                            any_changed = true;
                            self.results.lock().unwrap().insert(thread.id, result);
                        }
                        Poll::Pending => {
                            if thread.state != ThreadState::Blocked {
                                trace!(id = thread.id, name = %thread.name, "logical thread blocked");
                                thread.state = ThreadState::Blocked;
                                any_changed = true;
                            }
                        }
                    },
                }
            }

            if !any_changed && self.pending.lock().unwrap().is_empty() {
                break;
            }
        }

        self.running = false;

        Ok(self.threads.iter().all(|t| t.state == ThreadState::Done))
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn blocked_count(&self) -> usize {
        self.threads
            .iter()
            .filter(|t| t.state == ThreadState::Blocked)
            .count()
    }

    pub fn done_count(&self) -> usize {
        self.threads
            .iter()
            .filter(|t| t.state == ThreadState::Done)
            .count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock-free-enough spawn access for workflow code: allocates thread ids
/// and pushes new threads onto the dispatcher's pending queue, which the
/// run loop drains at the start of each iteration.
#[derive(Clone)]
pub struct SpawnHandle {
    sequence: Arc<AtomicU64>,
    pending: Arc<Mutex<Vec<LogicalThread>>>,
    results: ThreadResults,
}

impl SpawnHandle {
    pub fn next_thread_id(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn spawn(&self, thread: LogicalThread) -> u64 {
        let id = thread.id;
        self.pending.lock().unwrap().push(thread);
        id
    }

    pub fn results_handle(&self) -> ThreadResults {
        self.results.clone()
    }
}

/// Future resolving to a spawned logical thread's result.
///
/// Polls the shared result map; resolves once the dispatcher has run the
/// target thread to completion.
pub struct JoinFuture<T> {
    thread_id: u64,
    results: ThreadResults,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> JoinFuture<T> {
    pub fn new(thread_id: u64, results: ThreadResults) -> Self {
        Self {
            thread_id,
            results,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Send + 'static> Future for JoinFuture<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        let mut results = self.results.lock().unwrap();
        match results.remove(&self.thread_id) {
            // The result was stored by a thread spawned with the same T,
            // so the downcast cannot fail.
            Some(result) => Poll::Ready(*result.downcast::<T>().unwrap()),
            None => Poll::Pending,
        }
    }
}

fn noop_waker() -> Waker {
    unsafe fn noop_clone(_data: *const ()) -> RawWaker {
        noop_raw_waker()
    }

    unsafe fn noop(_data: *const ()) {}

    fn noop_raw_waker() -> RawWaker {
        RawWaker::new(
            std::ptr::null(),
            &RawWakerVTable::new(noop_clone, noop, noop, noop),
        )
    }

    unsafe { Waker::from_raw(noop_raw_waker()) }
}
