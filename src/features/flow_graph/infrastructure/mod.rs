pub mod cfg;
pub mod dominator;

pub use cfg::{BasicBlock, Cfg, NodeKey, AUGMENTED_START};
pub use dominator::{PostDominatorTree, VIRTUAL_EXIT};
