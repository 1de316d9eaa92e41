//! Per-procedure control-flow structure: basic blocks, the augmented CFG,
//! and the post-dominator tree built over it.

pub mod infrastructure;

pub use infrastructure::{BasicBlock, Cfg, NodeKey, PostDominatorTree, AUGMENTED_START, VIRTUAL_EXIT};
