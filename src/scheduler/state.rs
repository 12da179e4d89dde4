// src/scheduler/state.rs

//! Subroutine lifecycle.
//!
//! ```text
//! start ──> ready ──> active
//! ```
//!
//! `active` is terminal here; completion removes the subroutine altogether.

use std::fmt;
use std::str::FromStr;

use crate::errors::RascalError;

pub const INITIAL_STATE: &str = "start";
pub const READY_STATE: &str = "ready";
pub const ACTIVE_STATE: &str = "active";

/// Lifecycle state of a subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubroutineState {
    /// Constructed by the decomposer, not queued yet.
    Start,
    /// Waiting in the ready tier.
    Ready,
    /// Head of its device queue; handed to the execution layer.
    Active,
}

impl SubroutineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubroutineState::Start => INITIAL_STATE,
            SubroutineState::Ready => READY_STATE,
            SubroutineState::Active => ACTIVE_STATE,
        }
    }

    /// Check whether `self -> to` is a legal move.
    pub fn can_transition_to(self, to: SubroutineState) -> bool {
        matches!(
            (self, to),
            (SubroutineState::Start, SubroutineState::Ready)
                | (SubroutineState::Ready, SubroutineState::Active)
        )
    }
}

impl fmt::Display for SubroutineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubroutineState {
    type Err = RascalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            INITIAL_STATE => Ok(SubroutineState::Start),
            READY_STATE => Ok(SubroutineState::Ready),
            ACTIVE_STATE => Ok(SubroutineState::Active),
            _ => Err(RascalError::UnknownState(s.to_string())),
        }
    }
}

/// Apply a transition, returning the new state or the rejection.
pub fn transition(
    subroutine: &str,
    from: SubroutineState,
    to: SubroutineState,
) -> Result<SubroutineState, RascalError> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(RascalError::InvalidTransition {
            subroutine: subroutine.to_string(),
            from,
            to,
        })
    }
}
