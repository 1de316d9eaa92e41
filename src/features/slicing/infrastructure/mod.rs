pub mod data_dependence;
pub mod engine;
pub mod flow_builder;

pub use data_dependence::{add_uses, check_explicit_data_dependency, is_module_body};
pub use engine::SlicingEngine;
pub use flow_builder::{get_last_instruction, FlowCursor, FlowStep};
