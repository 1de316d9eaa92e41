pub mod cdg;

pub use cdg::ControlDependenceGraph;
