// src/dag/decomposer.rs

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::errors::{RascalError, Result};
use crate::model::{Action, Routine, Subroutine};

/// Default spacing between consecutive steps of a routine.
pub const DEFAULT_STEP_INCREMENT_SECS: i64 = 10;

/// Splits a routine into subroutines (flat-sequential policy).
///
/// Step `i` of the script becomes subroutine `i`, whose earliest start is
/// `trigger_time + i * step_increment` and whose only predecessor is
/// subroutine `i - 1`. Each subroutine carries the whole action prefix up
/// to and including its own step; its frontier is that one step.
#[derive(Debug, Clone)]
pub struct Decomposer {
    step_increment: TimeDelta,
}

impl Default for Decomposer {
    fn default() -> Self {
        Self {
            step_increment: TimeDelta::seconds(DEFAULT_STEP_INCREMENT_SECS),
        }
    }
}

impl Decomposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom step increment. Non-positive values would break the
    /// strictly increasing start times, so they fall back to the default.
    pub fn with_step_increment(step_increment: TimeDelta) -> Self {
        if step_increment <= TimeDelta::zero() {
            warn!(
                step_ms = step_increment.num_milliseconds(),
                "non-positive step increment; using default"
            );
            return Self::default();
        }
        Self { step_increment }
    }

    pub fn step_increment(&self) -> TimeDelta {
        self.step_increment
    }

    /// Decompose `routine` into its ordered subroutines.
    ///
    /// An empty script yields an empty vector. Every step must name a
    /// target device.
    pub fn decompose(&self, routine: &Routine) -> Result<Vec<Subroutine>> {
        let mut subroutines: Vec<Subroutine> = Vec::with_capacity(routine.action_script().len());
        let mut accumulated: Vec<Action> = Vec::new();

        for (step, payload) in routine.action_script().iter().enumerate() {
            let start_time = self.start_time_of(routine, step)?;
            let action = Action::new(None, payload.clone(), routine.id(), start_time);
            if action.target_device().is_none() {
                return Err(RascalError::MissingTarget {
                    routine: routine.id().to_string(),
                    step,
                });
            }
            accumulated.push(action);

            let predecessors = subroutines
                .last()
                .map(|prev| vec![prev.id().to_string()])
                .unwrap_or_default();

            let subroutine = Subroutine::new(None, accumulated.clone(), routine, start_time)
                .with_frontier(step)
                .with_predecessors(predecessors);

            // Keep the ids the prefix received so later subroutines reuse them.
            accumulated = subroutine.actions().to_vec();

            debug!(
                routine = %routine.id(),
                subroutine = %subroutine.id(),
                step,
                start = %start_time,
                "decomposed step"
            );

            subroutines.push(subroutine);
        }

        Ok(subroutines)
    }

    /// `trigger_time + step * step_increment`, or `StartTimeOverflow` if
    /// that instant is not representable.
    fn start_time_of(&self, routine: &Routine, step: usize) -> Result<DateTime<Utc>> {
        i32::try_from(step)
            .ok()
            .and_then(|n| self.step_increment.checked_mul(n))
            .and_then(|offset| routine.trigger_time().checked_add_signed(offset))
            .ok_or_else(|| RascalError::StartTimeOverflow {
                routine: routine.id().to_string(),
                step,
            })
    }
}
