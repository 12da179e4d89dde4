// src/scheduler/scheduler.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::dag::{Decomposer, SubroutineGraph};
use crate::engine::SubroutineOutcome;
use crate::errors::{RascalError, Result};
use crate::model::{Routine, Subroutine, TriggerRequest};
use crate::queue::{ActiveQueues, DeviceQueue, ReadyQueue};
use crate::scheduler::state::SubroutineState;
use crate::scheduler::state_manager::{RoutineEntry, StateManager, SubroutineEntry, Tables};
use crate::scheduler::step::{Dispatch, SchedulerStep};

/// The coordinator: owns every routine, the ready tier and the active tier.
///
/// It is responsible for:
/// - decomposing triggered routines and queueing their subroutines as ready
/// - promoting ready subroutines to their device queue once their start
///   time, device and predecessors allow it
/// - retiring subroutines and routines on completion
/// - cancelling whole routines on failure or request
///
/// All methods take `&mut self`; callers serialize access (the engine runs
/// it on a single task).
#[derive(Debug)]
pub struct Scheduler {
    decomposer: Decomposer,
    clock: Arc<dyn Clock>,
    tables: Tables,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Decomposer::default(), Arc::new(SystemClock))
    }
}

impl Scheduler {
    pub fn new(decomposer: Decomposer, clock: Arc<dyn Clock>) -> Self {
        Self {
            decomposer,
            clock,
            tables: Tables::default(),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// `true` when no routine is scheduled.
    pub fn is_idle(&self) -> bool {
        self.tables.routines.is_empty()
    }

    pub fn ready_routines(&self) -> &ReadyQueue {
        &self.tables.ready
    }

    pub fn active_routines(&self) -> &ActiveQueues {
        &self.tables.active
    }

    pub fn routine(&self, id: &str) -> Option<&Routine> {
        self.tables.routines.get(id).map(|e| &e.routine)
    }

    pub fn subroutine(&self, id: &str) -> Option<&Subroutine> {
        self.tables.subroutines.get(id).map(|e| &e.subroutine)
    }

    pub fn state_of(&self, subroutine: &str) -> Option<SubroutineState> {
        self.tables.subroutines.get(subroutine).map(|e| e.state)
    }

    /// Subroutines of `routine` that have not completed, in script order.
    pub fn subroutines_of(&self, routine: &str) -> Vec<&str> {
        self.tables
            .routines
            .get(routine)
            .map(|e| e.remaining.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Earliest future start time in the ready tier.
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.tables.ready.next_after(self.clock.now())
    }

    /// Register `device` with an empty active queue.
    ///
    /// Re-creating an existing queue replaces it. The subroutines it held
    /// are dropped, so their routines are cancelled.
    pub fn create_device_queue(&mut self, device: &str) -> Result<SchedulerStep> {
        let mut step = SchedulerStep::default();

        match self.tables.active.create(device) {
            Some(old) if !old.is_empty() => {
                warn!(
                    device = %device,
                    dropped = old.len(),
                    "device queue replaced; dropping in-flight subroutines"
                );
                step.merge(self.drop_device_queue(old));
            }
            Some(_) => debug!(device = %device, "device queue re-created"),
            None => info!(device = %device, "device queue created"),
        }

        step.dispatched.extend(self.promote()?);
        Ok(step)
    }

    /// Unregister `device`. A missing queue is an expected race and only
    /// logs a warning.
    pub fn delete_device_queue(&mut self, device: &str) -> Result<SchedulerStep> {
        let mut step = SchedulerStep::default();

        match self.tables.active.remove(device) {
            Some(old) => {
                info!(device = %device, in_flight = old.len(), "device queue deleted");
                step.merge(self.drop_device_queue(old));
            }
            None => {
                warn!(device = %device, "Unable to delete unknown queue");
                return Ok(step);
            }
        }

        step.dispatched.extend(self.promote()?);
        Ok(step)
    }

    /// Build a routine from a trigger request and schedule it.
    pub fn trigger(&mut self, request: TriggerRequest) -> Result<SchedulerStep> {
        let routine = Routine::from_request(request, self.clock.as_ref());
        self.schedule_routine(routine)
    }

    /// Decompose `routine`, queue its subroutines as ready and promote
    /// whatever can start right away.
    ///
    /// Nothing is recorded if decomposition or validation fails.
    pub fn schedule_routine(&mut self, routine: Routine) -> Result<SchedulerStep> {
        if self.tables.routines.contains_key(routine.id()) {
            return Err(RascalError::DuplicateRoutine(routine.id().to_string()));
        }

        let subroutines = self.decomposer.decompose(&routine)?;
        let graph = SubroutineGraph::from_subroutines(&subroutines)?;

        let mut seen = HashSet::new();
        for s in &subroutines {
            if self.tables.subroutines.contains_key(s.id()) || !seen.insert(s.id()) {
                return Err(RascalError::DuplicateSubroutine(s.id().to_string()));
            }
        }

        info!(
            routine = %routine.id(),
            subroutines = subroutines.len(),
            roots = ?graph.roots(),
            trigger_time = %routine.trigger_time(),
            "scheduling routine"
        );

        let routine_id = routine.id().to_string();
        if subroutines.is_empty() {
            info!(routine = %routine_id, "empty action script; routine retired");
            return Ok(SchedulerStep {
                retired: vec![routine_id],
                ..SchedulerStep::default()
            });
        }

        let mut entries = Vec::with_capacity(subroutines.len());
        for (step, subroutine) in subroutines.into_iter().enumerate() {
            let device = subroutine.target().ok_or_else(|| RascalError::MissingTarget {
                routine: routine_id.clone(),
                step,
            })?;
            entries.push(SubroutineEntry {
                subroutine,
                device,
                state: SubroutineState::Start,
            });
        }

        let remaining = entries
            .iter()
            .map(|e| e.subroutine.id().to_string())
            .collect();
        for entry in entries {
            self.tables
                .subroutines
                .insert(entry.subroutine.id().to_string(), entry);
        }
        self.tables
            .routines
            .insert(routine_id, RoutineEntry { routine, remaining });

        let mut manager = StateManager::new(&mut self.tables);
        for id in graph.topological_order() {
            manager.enqueue_ready(id)?;
        }

        Ok(SchedulerStep {
            dispatched: self.promote()?,
            ..SchedulerStep::default()
        })
    }

    /// Promote due subroutines (called when a timer fires).
    pub fn tick(&mut self) -> Result<SchedulerStep> {
        Ok(SchedulerStep {
            dispatched: self.promote()?,
            ..SchedulerStep::default()
        })
    }

    /// Completion or failure callback from the execution layer.
    ///
    /// Unknown ids are expected after a cancellation and are ignored.
    pub fn handle_completion(
        &mut self,
        subroutine: &str,
        outcome: SubroutineOutcome,
    ) -> Result<SchedulerStep> {
        let mut step = SchedulerStep::default();

        let Some(entry) = self.tables.subroutines.get(subroutine) else {
            warn!(subroutine = %subroutine, "completion for unknown subroutine; ignoring");
            return Ok(step);
        };

        if entry.state != SubroutineState::Active {
            return Err(RascalError::NotActive(subroutine.to_string()));
        }

        let device = entry.device.clone();
        let routine = entry.subroutine.routine().to_string();

        if let Some(queue) = self.tables.active.get_mut(&device) {
            if let Some(pos) = queue.position(subroutine) {
                queue.remove(pos);
            }
        }

        let mut manager = StateManager::new(&mut self.tables);
        match outcome {
            SubroutineOutcome::Success => {
                debug!(subroutine = %subroutine, device = %device, "subroutine completed");
                if let Some(retired) = manager.retire_subroutine(subroutine) {
                    step.retired.push(retired);
                }
            }
            SubroutineOutcome::Failed(reason) => {
                warn!(
                    subroutine = %subroutine,
                    routine = %routine,
                    device = %device,
                    %reason,
                    "subroutine failed; cancelling routine"
                );
                step.merge(manager.remove_routine(&routine));
                step.aborted.retain(|s| s != subroutine);
            }
        }

        step.dispatched.extend(self.promote()?);
        Ok(step)
    }

    /// Cancel a routine: every subroutine it owns leaves both tiers at once.
    pub fn cancel_routine(&mut self, routine: &str) -> Result<SchedulerStep> {
        if !self.tables.routines.contains_key(routine) {
            warn!(routine = %routine, "cancel for unknown routine; ignoring");
            return Ok(SchedulerStep::default());
        }

        info!(routine = %routine, "cancelling routine");
        let mut step = StateManager::new(&mut self.tables).remove_routine(routine);
        step.dispatched.extend(self.promote()?);
        Ok(step)
    }

    /// Explicit state-transition request by state name.
    ///
    /// Names must be one of `start`, `ready` or `active`, exactly; any other
    /// spelling is an unknown state.
    ///
    /// Rejected requests leave the scheduler untouched.
    pub fn request_transition(&mut self, subroutine: &str, target: &str) -> Result<SchedulerStep> {
        let to: SubroutineState = target.parse().inspect_err(|_| {
            error!(subroutine = %subroutine, state = %target, "Unable to process unknown state");
        })?;

        let from = self
            .state_of(subroutine)
            .ok_or_else(|| RascalError::SubroutineNotFound(subroutine.to_string()))?;

        if !from.can_transition_to(to) {
            return Err(RascalError::InvalidTransition {
                subroutine: subroutine.to_string(),
                from,
                to,
            });
        }

        let now = self.clock.now();
        let mut step = SchedulerStep::default();

        match to {
            SubroutineState::Ready => {
                StateManager::new(&mut self.tables).enqueue_ready(subroutine)?;
                step.dispatched.extend(self.promote()?);
            }
            SubroutineState::Active => {
                let mut manager = StateManager::new(&mut self.tables);
                if let Some(reason) = manager.blocked_reason(subroutine, now) {
                    return Err(RascalError::NotEligible {
                        subroutine: subroutine.to_string(),
                        reason,
                    });
                }
                step.dispatched.extend(manager.activate(subroutine)?);
            }
            SubroutineState::Start => {}
        }

        Ok(step)
    }

    fn promote(&mut self) -> Result<Vec<Dispatch>> {
        let now = self.clock.now();
        StateManager::new(&mut self.tables).collect_new_active(now)
    }

    /// Cancel the routines owning the subroutines of a dropped device queue.
    fn drop_device_queue(&mut self, queue: DeviceQueue) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        let mut manager = StateManager::new(&mut self.tables);

        for id in queue.iter() {
            let Some(routine) = manager.routine_of(id) else {
                continue;
            };
            step.merge(manager.remove_routine(&routine));
        }

        step
    }
}
