//! Dynamic backward slicing for checked-coverage analysis.
//!
//! Consumes an already-produced execution trace plus a per-procedure
//! control-flow graph and answers, for a given assertion, exactly which
//! instructions its observed value transitively depends on. Source
//! compilation, bytecode parsing, instrumentation, test-runner
//! integration and report generation all live outside this crate; it is
//! handed a trace and a registry of procedure metadata and returns slices.
//!
//! - [`shared::models`] — the opcode enumeration and the static/dynamic
//!   instruction representations everything else is built from.
//! - [`features::flow_graph`] — per-procedure CFG, its augmentation with a
//!   synthetic start node, and the post-dominator tree over it.
//! - [`features::control_dependence`] — the CDG derived from that tree.
//! - [`features::execution_trace`] — the trace event taxonomy and the
//!   registry of procedure metadata trace events are resolved against.
//! - [`features::stack_effect`] — the static stack-effect oracle and the
//!   backward operand-stack simulator built on it.
//! - [`features::slicing`] — the execution-flow reconstructor, the
//!   explicit-data-dependence analysis, and [`features::slicing::SlicingEngine`]
//!   that drives the backward walk combining all three dependency kinds.
//! - [`adapters`] — the on-disk bundle format the `checked-slicer` binary
//!   reads a registry and trace from; the only place this crate talks to
//!   a concrete serialization.

pub mod adapters;
pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use adapters::{load_bundle, BundleFile};
pub use config::{Preset, SlicingConfig};
pub use errors::{Result, SlicerError};
pub use features::control_dependence::ControlDependenceGraph;
pub use features::execution_trace::{
    CodeObjectMetadata, CodeObjectRegistry, ExecutedInstruction, ExecutionTrace, TracedAssertion, TracedLocation, UniqueAssertion,
};
pub use features::flow_graph::{BasicBlock, Cfg, PostDominatorTree};
pub use features::slicing::{DynamicSlice, SlicingContext, SlicingCriterion, SlicingEngine};
pub use features::stack_effect::{stack_effect, TraceStack};
pub use shared::models::{BasicBlockId, CodeObjectId, Instruction, Opcode, UniqueInstruction};
