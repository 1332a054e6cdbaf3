//! Accumulation of decisions produced during one decide pass.

use thiserror::Error;
use windlass_proto::Decision;

/// Misuse of the accumulator's write-once lifecycle. Programming errors,
/// surfaced immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    #[error("decision emitted after the accumulator was sealed")]
    Sealed,
    #[error("execution context already written for this decide pass")]
    ContextAlreadySet,
}

/// Collects the ordered decisions of one decide pass together with the
/// sticky context blob carried to the next decision task.
///
/// Emission order is preserved exactly; sealing is one-way. One
/// accumulator serves exactly one decision task.
#[derive(Default)]
pub struct DecisionAccumulator {
    decisions: Vec<Decision>,
    execution_context: Option<Vec<u8>>,
    sealed: bool,
}

impl DecisionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision. Duplicates are never merged; the caller decides
    /// what to emit.
    pub fn emit(&mut self, decision: Decision) -> Result<(), AccumulatorError> {
        if self.sealed {
            return Err(AccumulatorError::Sealed);
        }
        self.decisions.push(decision);
        Ok(())
    }

    /// Record the context blob carried forward to the next decision task.
    /// Written at most once per pass.
    pub fn set_execution_context(&mut self, blob: Vec<u8>) -> Result<(), AccumulatorError> {
        if self.sealed {
            return Err(AccumulatorError::Sealed);
        }
        if self.execution_context.is_some() {
            return Err(AccumulatorError::ContextAlreadySet);
        }
        self.execution_context = Some(blob);
        Ok(())
    }

    /// Remove the first pending decision matching `predicate`.
    ///
    /// Replay reconciliation: when history shows an operation was already
    /// scheduled by a previous pass, the decision re-derived for it this
    /// pass must not be sent again. Returns whether a decision was
    /// retired; sealed accumulators retire nothing.
    pub fn retire<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(&Decision) -> bool,
    {
        if self.sealed {
            return false;
        }
        match self.decisions.iter().position(predicate) {
            Some(index) => {
                self.decisions.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Finalize the pass: returns the ordered decisions and the context
    /// blob, and rejects any further emission.
    pub fn seal(&mut self) -> (Vec<Decision>, Option<Vec<u8>>) {
        self.sealed = true;
        (
            std::mem::take(&mut self.decisions),
            self.execution_context.take(),
        )
    }
}
