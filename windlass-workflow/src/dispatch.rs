//! Per-logical-thread capture slot for asynchronous dispatch.
//!
//! Workflow code invokes stubs in ordinary direct style. Inside a capture
//! block the submission path records the operation's real future here
//! instead of handing it to the caller, so the caller retrieves it through
//! `end_capture` without the stub changing its signature.
//!
//! A context belongs to exactly one logical thread. It is handed around as
//! an explicit capability, never shared across concurrently running
//! logical threads.

use crate::future::OperationFuture;
use thiserror::Error;

/// Contract violations of the capture protocol. These are programming
/// errors, never transient conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("capture already active on this logical thread")]
    AlreadyCapturing,
    #[error("no capture active on this logical thread")]
    NotCapturing,
    #[error("capture result already recorded")]
    AlreadyRecorded,
    #[error("no stub call was recorded during the capture")]
    NothingRecorded,
}

/// Holds at most one pending operation future for the owning logical
/// thread while a capture block is active.
#[derive(Default)]
pub struct AsyncDispatchContext {
    // None: no capture active. Some(None): capture active, nothing
    // recorded yet. Some(Some(_)): result recorded, awaiting end_capture.
    slot: Option<Option<OperationFuture>>,
}

impl AsyncDispatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.slot.is_some()
    }

    /// Associate a fresh, empty result slot with this logical thread.
    /// Capture blocks do not nest.
    pub fn begin_capture(&mut self) -> Result<(), DispatchError> {
        if self.slot.is_some() {
            return Err(DispatchError::AlreadyCapturing);
        }
        self.slot = Some(None);
        Ok(())
    }

    /// Record the intercepted call's future. At most one result per
    /// capture; a second recording fails rather than overwriting.
    pub fn record_result(&mut self, result: OperationFuture) -> Result<(), DispatchError> {
        let slot = self.slot.as_mut().ok_or(DispatchError::NotCapturing)?;
        if slot.is_some() {
            return Err(DispatchError::AlreadyRecorded);
        }
        *slot = Some(result);
        Ok(())
    }

    /// Retrieve the recorded future and clear the slot. The slot is
    /// cleared on the failure path too, so the logical thread can start an
    /// unrelated capture afterwards.
    pub fn end_capture(&mut self) -> Result<OperationFuture, DispatchError> {
        match self.slot.take() {
            None => Err(DispatchError::NotCapturing),
            Some(None) => Err(DispatchError::NothingRecorded),
            Some(Some(result)) => Ok(result),
        }
    }
}
