//! Glue between the crate's in-memory model and the outside world. The
//! slicer's own boundary is already the trace and the procedure registry —
//! this module just owns one concrete on-disk shape for supplying them,
//! since compilation, instrumentation and trace capture are all external
//! collaborators the core never depends on.

pub mod bundle;

pub use bundle::{load_bundle, BundleFile};
