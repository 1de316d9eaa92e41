//! The static stack-effect oracle and the backward stack simulator built
//! on top of it.

pub mod infrastructure;

pub use infrastructure::{stack_effect, StackEffect, TraceStack, ARTIFICIAL_CODE_OBJECT};
