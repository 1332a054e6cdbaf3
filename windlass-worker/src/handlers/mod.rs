//! Task handlers for processing decision tasks polled from the
//! orchestration service.

pub mod decision;

pub use decision::{DecisionTaskHandler, DecisionTaskResult};
