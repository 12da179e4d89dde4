// src/engine/mod.rs

//! Orchestration engine for rascal.
//!
//! The scheduler is mutated from one place only: the runtime loop. Routine
//! triggers, device registrations, completion callbacks and timer wake-ups
//! all arrive as [`SchedulerEvent`]s and are applied one at a time, to
//! completion.
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::model::{DeviceId, RoutineId, SubroutineId, TriggerRequest};

/// Outcome the execution layer reports for a dispatched subroutine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubroutineOutcome {
    Success,
    Failed(String),
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no routine is left (used for
    /// `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the host and the execution layer.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A routine was triggered by the host automation engine.
    RoutineTriggered(TriggerRequest),
    /// A device became available.
    DeviceRegistered { device: DeviceId },
    /// A device went away.
    DeviceRemoved { device: DeviceId },
    /// The execution layer finished a subroutine.
    SubroutineCompleted {
        subroutine: SubroutineId,
        outcome: SubroutineOutcome,
    },
    /// The host cancelled a routine.
    RoutineCancelled { routine: RoutineId },
    /// A scheduled start time may have arrived.
    Tick,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
