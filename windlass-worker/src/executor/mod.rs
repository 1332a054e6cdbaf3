//! Replay execution internals: per-instance replay bookkeeping and the
//! decider that drives workflow logical threads against it.

pub mod decider;
pub mod replay;
