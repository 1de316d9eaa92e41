//! Execution trace model and the per-procedure registry it is replayed
//! against.

pub mod domain;

pub use domain::{CodeObjectMetadata, CodeObjectRegistry, ExecutedInstruction, ExecutionTrace, TracedAssertion, TracedLocation, UniqueAssertion};
