//! Trace graph reconstruction.
//!
//! This module turns a normalized export into:
//! - One [`Trace`] owning every observation
//! - [`Observation`]s with assigned ids and resolved parent links
//! - The warnings raised while repairing references

pub mod builder;
pub mod ids;
pub mod model;

// Re-export main types and functions
pub use builder::{build_graph, find_cycle};
pub use ids::{is_valid_id, IdAllocator, IdPolicy};
pub use model::{
    GenerationDetails, Observation, ObservationKind, ParentRef, Timestamp, Trace, TraceGraph,
};
