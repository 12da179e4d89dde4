// src/scheduler/state_manager.rs

//! State transitions across the ready and active tiers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::model::{DeviceId, Routine, RoutineId, Subroutine, SubroutineId};
use crate::queue::{ActiveQueues, ReadyQueue};
use crate::scheduler::state::{SubroutineState, transition};
use crate::scheduler::step::{Dispatch, SchedulerStep};

/// Arena entry for a subroutine owned by the scheduler.
#[derive(Debug, Clone)]
pub(crate) struct SubroutineEntry {
    pub subroutine: Subroutine,
    pub device: DeviceId,
    pub state: SubroutineState,
}

/// Arena entry for a routine owned by the scheduler.
#[derive(Debug, Clone)]
pub(crate) struct RoutineEntry {
    pub routine: Routine,
    /// Subroutines not yet completed, in script order.
    pub remaining: Vec<SubroutineId>,
}

/// Everything the scheduler owns. Entities refer to each other by id into
/// these maps.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub routines: HashMap<RoutineId, RoutineEntry>,
    pub subroutines: HashMap<SubroutineId, SubroutineEntry>,
    pub ready: ReadyQueue,
    pub active: ActiveQueues,
}

/// Applies state transitions to the scheduler tables.
pub(crate) struct StateManager<'a> {
    tables: &'a mut Tables,
}

impl<'a> StateManager<'a> {
    pub fn new(tables: &'a mut Tables) -> Self {
        Self { tables }
    }

    /// `start -> ready`: place the subroutine into the ready tier.
    pub fn enqueue_ready(&mut self, id: &str) -> Result<()> {
        let Some(entry) = self.tables.subroutines.get_mut(id) else {
            warn!(subroutine = %id, "enqueue for unknown subroutine; ignoring");
            return Ok(());
        };

        entry.state = transition(id, entry.state, SubroutineState::Ready)?;
        self.tables
            .ready
            .insert(entry.subroutine.start_time(), id.to_string());

        debug!(
            subroutine = %id,
            from = %SubroutineState::Start,
            to = %SubroutineState::Ready,
            start = %entry.subroutine.start_time(),
            "changed subroutine state"
        );
        Ok(())
    }

    /// Why `id` cannot move `ready -> active` at `now`, or `None` if it can.
    pub fn blocked_reason(&self, id: &str, now: DateTime<Utc>) -> Option<String> {
        let Some(entry) = self.tables.subroutines.get(id) else {
            return Some(format!("subroutine '{id}' is not scheduled"));
        };

        let start = entry.subroutine.start_time();
        if start > now {
            return Some(format!("scheduled for {start}"));
        }

        match self.tables.active.get(&entry.device) {
            None => return Some(format!("device queue '{}' is not registered", entry.device)),
            Some(queue) => {
                if let Some(head) = queue.front() {
                    return Some(format!("device '{}' is busy with '{head}'", entry.device));
                }
            }
        }

        entry
            .subroutine
            .predecessors()
            .iter()
            .find(|pred| self.tables.subroutines.contains_key(pred.as_str()))
            .map(|pred| format!("waiting on predecessor '{pred}'"))
    }

    /// `ready -> active`: pull the subroutine out of the ready tier and make
    /// it the head of its device queue.
    ///
    /// Callers must have checked [`Self::blocked_reason`].
    pub fn activate(&mut self, id: &str) -> Result<Option<Dispatch>> {
        let Some(entry) = self.tables.subroutines.get_mut(id) else {
            warn!(subroutine = %id, "activation for unknown subroutine; ignoring");
            return Ok(None);
        };

        let from = entry.state;
        entry.state = transition(id, from, SubroutineState::Active)?;

        self.tables.ready.remove(entry.subroutine.start_time(), id);
        match self.tables.active.get_mut(&entry.device) {
            Some(queue) => queue.push_back(id.to_string()),
            None => warn!(subroutine = %id, device = %entry.device, "device queue vanished during activation"),
        }

        debug!(subroutine = %id, %from, to = %SubroutineState::Active, "changed subroutine state");

        let routine = self.tables.routines.get(entry.subroutine.routine());
        let dispatch = Dispatch {
            subroutine: id.to_string(),
            routine: entry.subroutine.routine().to_string(),
            device: entry.device.clone(),
            actions: entry.subroutine.frontier().to_vec(),
            variables: routine
                .map(|r| r.routine.variables().clone())
                .unwrap_or_default(),
            context: routine.and_then(|r| r.routine.context().cloned()),
        };

        info!(
            subroutine = %dispatch.subroutine,
            routine = %dispatch.routine,
            device = %dispatch.device,
            actions = dispatch.actions.len(),
            "dispatching subroutine"
        );

        Ok(Some(dispatch))
    }

    /// Promote every due ready subroutine whose gates are open.
    ///
    /// Candidates are visited in start-time order, then insertion order, so
    /// subroutines for the same device activate in script order. A device
    /// that accepts one subroutine is busy for the rest of the pass.
    pub fn collect_new_active(&mut self, now: DateTime<Utc>) -> Result<Vec<Dispatch>> {
        let mut dispatched = Vec::new();

        for (_, id) in self.tables.ready.due(now) {
            if let Some(reason) = self.blocked_reason(&id, now) {
                debug!(subroutine = %id, %reason, "subroutine stays ready");
                continue;
            }
            if let Some(dispatch) = self.activate(&id)? {
                dispatched.push(dispatch);
            }
        }

        Ok(dispatched)
    }

    /// Remove a routine and every subroutine it still owns from both tiers.
    ///
    /// Active subroutines are reported in `aborted` so the caller can stop
    /// them in the execution layer.
    pub fn remove_routine(&mut self, routine_id: &str) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(entry) = self.tables.routines.remove(routine_id) else {
            return step;
        };

        for id in entry.remaining {
            let Some(sub) = self.tables.subroutines.remove(&id) else {
                continue;
            };

            match sub.state {
                SubroutineState::Start => {}
                SubroutineState::Ready => {
                    self.tables.ready.remove(sub.subroutine.start_time(), &id);
                }
                SubroutineState::Active => {
                    if let Some(queue) = self.tables.active.get_mut(&sub.device) {
                        if let Some(pos) = queue.position(&id) {
                            queue.remove(pos);
                        }
                    }
                    step.aborted.push(id.clone());
                }
            }
        }

        step.cancelled.push(routine_id.to_string());
        step
    }

    /// Id of the routine owning subroutine `id`.
    pub fn routine_of(&self, id: &str) -> Option<RoutineId> {
        self.tables
            .subroutines
            .get(id)
            .map(|e| e.subroutine.routine().to_string())
    }

    /// Drop a finished subroutine from the arena and retire its routine if
    /// it was the last one.
    pub fn retire_subroutine(&mut self, id: &str) -> Option<RoutineId> {
        let sub = self.tables.subroutines.remove(id)?;
        let routine_id = sub.subroutine.routine().to_string();

        let entry = self.tables.routines.get_mut(&routine_id)?;
        entry.remaining.retain(|s| s != id);
        if !entry.remaining.is_empty() {
            return None;
        }

        self.tables.routines.remove(&routine_id);
        info!(routine = %routine_id, "all subroutines completed; routine retired");
        Some(routine_id)
    }
}
