// src/model/subroutine.rs

use chrono::{DateTime, Utc};

use crate::model::id::derive_child_id;
use crate::model::{Action, DeviceId, Routine, RoutineId, SubroutineId};

/// A scheduling unit derived from a routine; the dispatch granularity.
///
/// `actions` holds the dependency prefix this subroutine completes: the
/// actions already covered by its predecessors followed by its own
/// *frontier* (`actions[frontier..]`). Only the frontier is ever dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct Subroutine {
    id: SubroutineId,
    actions: Vec<Action>,
    routine: RoutineId,
    start_time: DateTime<Utc>,
    predecessors: Vec<SubroutineId>,
    frontier: usize,
}

impl Subroutine {
    /// Finalize a subroutine.
    ///
    /// Without an explicit `id`, one is derived from the routine id. Every
    /// action that has no id yet receives `<subroutine id>-<position>`.
    pub fn new(
        id: Option<SubroutineId>,
        mut actions: Vec<Action>,
        routine: &Routine,
        start_time: DateTime<Utc>,
    ) -> Self {
        let id = id.unwrap_or_else(|| derive_child_id(routine.id()));

        for (no, action) in actions.iter_mut().enumerate() {
            action.assign_id_if_missing(|| format!("{id}-{no}"));
        }

        Self {
            id,
            actions,
            routine: routine.id().to_string(),
            start_time,
            predecessors: Vec::new(),
            frontier: 0,
        }
    }

    /// Subroutines that must complete before this one may become active.
    pub fn with_predecessors(mut self, predecessors: Vec<SubroutineId>) -> Self {
        self.predecessors = predecessors;
        self
    }

    /// Mark `actions[frontier..]` as the actions this subroutine adds.
    pub fn with_frontier(mut self, frontier: usize) -> Self {
        self.frontier = frontier.min(self.actions.len());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Actions this subroutine contributes on top of its predecessors.
    pub fn frontier(&self) -> &[Action] {
        &self.actions[self.frontier..]
    }

    /// Id of the owning routine.
    pub fn routine(&self) -> &str {
        &self.routine
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn predecessors(&self) -> &[SubroutineId] {
        &self.predecessors
    }

    /// Device the frontier operates on (taken from its last action).
    pub fn target(&self) -> Option<DeviceId> {
        self.frontier().last().and_then(Action::target_device)
    }
}
