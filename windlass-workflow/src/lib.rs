//! Workflow-side primitives for the Windlass replay engine.
//!
//! This crate provides the pieces workflow code executes on top of: the
//! deterministic cooperative dispatcher, the per-logical-thread async
//! dispatch context, the authoring context with its command-sink seam, and
//! the decision accumulator filled during a decide pass.

pub mod commands;
pub mod context;
pub mod decisions;
pub mod dispatch;
pub mod dispatcher;
pub mod future;

pub use commands::WorkflowCommand;
pub use context::{
    CommandSink, QueryHandler, QueryHandlers, SignalBuffers, SignalChannel, WorkflowContext,
};
pub use decisions::{AccumulatorError, DecisionAccumulator};
pub use dispatch::{AsyncDispatchContext, DispatchError};
pub use dispatcher::{
    Dispatcher, DispatcherError, JoinFuture, LogicalThread, SpawnHandle, ThreadState,
};
pub use future::{OperationFuture, WorkflowError};
