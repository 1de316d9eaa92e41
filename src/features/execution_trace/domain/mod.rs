pub mod code_object;
pub mod trace;

pub use code_object::{CodeObjectMetadata, CodeObjectRegistry};
pub use trace::{ExecutedInstruction, ExecutionTrace, TracedAssertion, TracedLocation, UniqueAssertion};
