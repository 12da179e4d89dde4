// src/scheduler/step.rs

//! Result types for scheduler steps.

use crate::model::{Action, Context, DeviceId, RoutineId, SubroutineId, Variables};

/// What the execution layer receives when a subroutine becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub subroutine: SubroutineId,
    pub routine: RoutineId,
    pub device: DeviceId,
    /// The subroutine's frontier, in script order.
    pub actions: Vec<Action>,
    pub variables: Variables,
    pub context: Option<Context>,
}

/// Structured result of a single scheduler operation.
///
/// Tests use it to assert on exactly what changed; the engine turns it
/// into commands for the IO shell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStep {
    /// Subroutines that moved `ready -> active` in this step.
    pub dispatched: Vec<Dispatch>,
    /// Active subroutines that were pulled out while in flight.
    pub aborted: Vec<SubroutineId>,
    /// Routines whose last subroutine completed.
    pub retired: Vec<RoutineId>,
    /// Routines removed because of cancellation or failure.
    pub cancelled: Vec<RoutineId>,
}

impl SchedulerStep {
    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty()
            && self.aborted.is_empty()
            && self.retired.is_empty()
            && self.cancelled.is_empty()
    }

    pub fn merge(&mut self, other: SchedulerStep) {
        self.dispatched.extend(other.dispatched);
        self.aborted.extend(other.aborted);
        self.retired.extend(other.retired);
        self.cancelled.extend(other.cancelled);
    }

    /// Ids of the dispatched subroutines, in dispatch order.
    pub fn dispatched_ids(&self) -> Vec<&str> {
        self.dispatched.iter().map(|d| d.subroutine.as_str()).collect()
    }
}
