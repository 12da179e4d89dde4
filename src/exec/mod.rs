// src/exec/mod.rs

//! Execution layer seam.
//!
//! The scheduler never carries out an action itself. Dispatched
//! subroutines go to an [`ExecutorBackend`], which reports completion back
//! as `SchedulerEvent::SubroutineCompleted`.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `SimulatedExecutorBackend` used by the `rascal` binary; tests replace
//!   it with fakes.
//! - [`executor_loop`] owns the background loop that tracks in-flight
//!   subroutines.
//! - [`action_runner`] plays out one dispatched subroutine.

pub mod action_runner;
pub mod backend;
pub mod executor_loop;

pub use backend::{ExecutorBackend, SimulatedExecutorBackend};
pub use executor_loop::{ExecutorRequest, spawn_executor};
