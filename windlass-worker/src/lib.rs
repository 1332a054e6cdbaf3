//! Worker-side replay pipeline for the Windlass engine.
//!
//! This crate turns a decision task's event history into the next batch of
//! decisions: the history cursor segments events into per-task batches,
//! the replay decider re-executes workflow code against them, and the
//! decision task handler wraps the whole pass in a uniform response
//! envelope that never lets a workflow failure escape the process.

pub mod executor;
pub mod handlers;
pub mod history;
pub mod registry;

pub use executor::decider::ReplayDecider;
pub use executor::replay::ReplayState;
pub use handlers::{DecisionTaskHandler, DecisionTaskResult};
pub use history::{DecisionBatch, HistoryCursor};
pub use registry::{WorkflowDefinition, WorkflowFactory, WorkflowRegistry};
