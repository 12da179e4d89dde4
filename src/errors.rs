// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::model::{RoutineId, SubroutineId};
use crate::scheduler::SubroutineState;

#[derive(Error, Debug)]
pub enum RascalError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Routine already scheduled: {0}")]
    DuplicateRoutine(RoutineId),

    #[error("Subroutine id collision: {0}")]
    DuplicateSubroutine(SubroutineId),

    #[error("Routine '{routine}' step {step} does not name a target device")]
    MissingTarget { routine: RoutineId, step: usize },

    #[error("Routine '{routine}' step {step} start time is out of range")]
    StartTimeOverflow { routine: RoutineId, step: usize },

    #[error("Cycle detected in subroutine DAG: {0}")]
    DagCycle(String),

    #[error("Subroutine not found: {0}")]
    SubroutineNotFound(SubroutineId),

    #[error("Unknown subroutine state: {0}")]
    UnknownState(String),

    #[error("Invalid transition for subroutine '{subroutine}': {from} -> {to}")]
    InvalidTransition {
        subroutine: SubroutineId,
        from: SubroutineState,
        to: SubroutineState,
    },

    #[error("Subroutine '{subroutine}' cannot become active yet: {reason}")]
    NotEligible {
        subroutine: SubroutineId,
        reason: String,
    },

    #[error("Subroutine '{0}' reported completion but is not active")]
    NotActive(SubroutineId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RascalError>;
