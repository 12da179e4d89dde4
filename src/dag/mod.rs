// src/dag/mod.rs

//! Routine decomposition.
//!
//! - [`decomposer`] turns a routine's flat action script into an ordered
//!   sequence of subroutines with increasing earliest-start times.
//! - [`graph`] holds the explicit predecessor links between those
//!   subroutines and checks they form a DAG.

pub mod decomposer;
pub mod graph;

pub use decomposer::{DEFAULT_STEP_INCREMENT_SECS, Decomposer};
pub use graph::SubroutineGraph;
