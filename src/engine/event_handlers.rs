// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{error, info};

use crate::engine::{RuntimeOptions, SubroutineOutcome};
use crate::errors::Result;
use crate::model::{SubroutineId, TriggerRequest};
use crate::scheduler::{Dispatch, Scheduler, SchedulerStep};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Hand these subroutines to the executor.
    Dispatch(Vec<Dispatch>),
    /// Stop these in-flight subroutines.
    Abort(Vec<SubroutineId>),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_scheduler_step(step: SchedulerStep) -> Self {
        let mut commands = Vec::new();
        if !step.aborted.is_empty() {
            commands.push(CoreCommand::Abort(step.aborted));
        }
        if !step.dispatched.is_empty() {
            commands.push(CoreCommand::Dispatch(step.dispatched));
        }
        Self {
            commands,
            keep_running: true,
        }
    }

    fn empty() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Turn a scheduler result into commands.
///
/// Scheduler errors are reported and dropped here: one bad request must
/// not bring the loop down. Any step that retires or cancels a routine may
/// leave the scheduler idle, which ends the loop in `--once` mode.
pub fn handle_scheduler_result(
    scheduler: &Scheduler,
    options: &RuntimeOptions,
    what: &str,
    result: Result<SchedulerStep>,
) -> CoreStep {
    match result {
        Ok(step) => {
            let finished = !step.retired.is_empty() || !step.cancelled.is_empty();
            let core_step = CoreStep::from_scheduler_step(step);
            if finished {
                maybe_exit(scheduler, options, core_step)
            } else {
                core_step
            }
        }
        Err(e) => {
            error!(error = %e, "{what} rejected");
            CoreStep::empty()
        }
    }
}

/// Handle a routine trigger.
pub fn handle_routine_triggered(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    request: TriggerRequest,
) -> CoreStep {
    let routine = request.routine_id.clone();
    let result = scheduler.trigger(request);
    match &result {
        Ok(step) => {
            for retired in &step.retired {
                info!(routine = %retired, "routine finished immediately");
            }
        }
        Err(_) => error!(routine = %routine, "routine trigger failed"),
    }
    handle_scheduler_result(scheduler, options, "routine trigger", result)
}

/// Handle a completion callback from the execution layer.
pub fn handle_completion(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    subroutine: &str,
    outcome: SubroutineOutcome,
) -> CoreStep {
    let result = scheduler.handle_completion(subroutine, outcome);
    handle_scheduler_result(scheduler, options, "completion", result)
}

/// Handle a cancellation request from the host.
pub fn handle_routine_cancelled(
    scheduler: &mut Scheduler,
    options: &RuntimeOptions,
    routine: &str,
) -> CoreStep {
    let result = scheduler.cancel_routine(routine);
    handle_scheduler_result(scheduler, options, "cancellation", result)
}

/// In `--once` mode, exit when no routine is left.
fn maybe_exit(scheduler: &Scheduler, options: &RuntimeOptions, mut step: CoreStep) -> CoreStep {
    if options.exit_when_idle && scheduler.is_idle() {
        step.keep_running = false;
        step.commands.push(CoreCommand::RequestExit);
    }
    step
}
