// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`SchedulerEvent`]s and produces:
//! - an updated scheduler state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from channels, arming the wake-up timer and handing dispatches
//! to the executor.

use chrono::{DateTime, Utc};

use crate::clock::Clock;

use crate::engine::event_handlers::{
    CoreStep, handle_completion, handle_routine_cancelled, handle_routine_triggered,
    handle_scheduler_result,
};
use crate::engine::{RuntimeOptions, SchedulerEvent};
use crate::scheduler::Scheduler;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self { scheduler, options }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// When the shell should inject the next [`SchedulerEvent::Tick`].
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_wakeup()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.clock().now()
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: SchedulerEvent) -> CoreStep {
        let scheduler = &mut self.scheduler;
        let options = &self.options;

        match event {
            SchedulerEvent::RoutineTriggered(request) => {
                handle_routine_triggered(scheduler, options, request)
            }
            SchedulerEvent::DeviceRegistered { device } => {
                let result = scheduler.create_device_queue(&device);
                handle_scheduler_result(scheduler, options, "device registration", result)
            }
            SchedulerEvent::DeviceRemoved { device } => {
                let result = scheduler.delete_device_queue(&device);
                handle_scheduler_result(scheduler, options, "device removal", result)
            }
            SchedulerEvent::SubroutineCompleted {
                subroutine,
                outcome,
            } => handle_completion(scheduler, options, &subroutine, outcome),
            SchedulerEvent::RoutineCancelled { routine } => {
                handle_routine_cancelled(scheduler, options, &routine)
            }
            SchedulerEvent::Tick => {
                let result = scheduler.tick();
                handle_scheduler_result(scheduler, options, "tick", result)
            }
            SchedulerEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
