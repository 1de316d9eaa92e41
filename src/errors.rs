//! Crate-wide error taxonomy.
//!
//! One variant per error kind in the design's error taxonomy. `UncertainStackEffect`
//! is included here because the oracle surfaces it as a `Result`, but callers
//! inside the engine recover from it locally (see `stack_effect::oracle`) —
//! it should never escape `SlicingEngine::slice`.

use thiserror::Error;

use crate::shared::models::opcode::Opcode;

#[derive(Debug, Error)]
pub enum SlicerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("instruction not found: code_object={code_object_id} block={basic_block_id} offset={offset}")]
    InstructionNotFound {
        code_object_id: u32,
        basic_block_id: u32,
        offset: u32,
    },

    #[error("uncertain stack effect for opcode {0:?}")]
    UncertainStackEffect(Opcode),

    #[error("slicing timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    SlicingTimeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("test timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    TestTimeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SlicerError>;

impl SlicerError {
    pub fn invariant(message: impl Into<String>) -> Self {
        SlicerError::Invariant(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        SlicerError::Configuration(message.into())
    }
}
