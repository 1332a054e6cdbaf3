//! Semantic protocol types for the Windlass replay engine.
//!
//! These types mirror the orchestration service's data model for workflow
//! history, decisions, and decision-task responses. They are semantic, not
//! wire-exact: transport encoding lives outside this workspace.

pub mod shared;
pub mod workflow_service;

pub use shared::*;
pub use workflow_service::*;
