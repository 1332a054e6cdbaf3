//! Core types and errors shared across the Windlass workspace.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
