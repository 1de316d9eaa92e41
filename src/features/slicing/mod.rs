//! The dynamic slicer: the slicing criterion and mutable walk state
//! (`domain`), and the flow reconstructor, explicit-data-dependence
//! analysis and main backward loop that operate on them (`infrastructure`).

pub mod domain;
pub mod infrastructure;

pub use domain::{DynamicSlice, GlobalKey, LocalKey, NonlocalKey, SlicingContext, SlicingCriterion};
pub use infrastructure::{get_last_instruction, FlowCursor, FlowStep, SlicingEngine};
