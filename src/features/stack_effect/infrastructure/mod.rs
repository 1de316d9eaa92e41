pub mod oracle;
pub mod simulation;

pub use oracle::{stack_effect, StackEffect};
pub use simulation::{TraceStack, ARTIFICIAL_CODE_OBJECT};
