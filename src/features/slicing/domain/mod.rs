pub mod context;

pub use context::{DynamicSlice, GlobalKey, LocalKey, NonlocalKey, SlicingContext, SlicingCriterion};
