// src/scheduler/mod.rs

//! The scheduler entity and the subroutine state machine.
//!
//! - [`scheduler`] holds the coordinator that owns both tiers.
//! - [`state`] defines the `start -> ready -> active` lifecycle.
//! - [`state_manager`] applies transitions across the tiers.
//! - [`step`] defines the result type of scheduler operations.

pub mod scheduler;
pub mod state;
pub(crate) mod state_manager;
pub mod step;

pub use scheduler::Scheduler;
pub use state::{ACTIVE_STATE, INITIAL_STATE, READY_STATE, SubroutineState};
pub use step::{Dispatch, SchedulerStep};
