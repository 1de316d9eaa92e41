//! Vertical feature slices, leaves first: the control-flow/post-dominator
//! structure and the stack-effect oracle have no dependencies on the rest
//! of the crate; the execution-trace model depends on control dependence
//! and flow graphs for its registered code-object metadata; the slicer
//! depends on all three.

pub mod control_dependence;
pub mod execution_trace;
pub mod flow_graph;
pub mod slicing;
pub mod stack_effect;
