//! Control dependence between basic blocks, derived from the post-dominator
//! tree of a procedure's augmented CFG.

pub mod infrastructure;

pub use infrastructure::ControlDependenceGraph;
