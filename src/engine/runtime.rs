// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::scheduler::Dispatch;

use super::core::CoreRuntime;
use super::{CoreCommand, SchedulerEvent};

/// Drives the scheduler in response to `SchedulerEvent`s and delegates
/// execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`. Besides reading events it
/// owns the wake-up timer: when the earliest future start time in the ready
/// tier comes due, it feeds a `Tick` into the core.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<SchedulerEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<SchedulerEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `SchedulerEvent`s from `event_rx`, or a `Tick` when the
    ///   next start time arrives first.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch, abort, exit).
    pub async fn run(mut self) -> Result<()> {
        info!("rascal runtime started");

        loop {
            let wakeup = self.time_until_wakeup();

            let event = tokio::select! {
                received = self.event_rx.recv() => match received {
                    Some(e) => e,
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
                _ = sleep_for(wakeup) => SchedulerEvent::Tick,
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    fn time_until_wakeup(&self) -> Option<Duration> {
        let at = self.core.next_wakeup()?;
        Some((at - self.core.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch(batch) => self.dispatch(batch).await?,
            CoreCommand::Abort(subroutines) => {
                debug!(?subroutines, "aborting in-flight subroutines");
                self.executor.abort(subroutines).await?;
            }
            CoreCommand::RequestExit => {
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, batch: Vec<Dispatch>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let ids: Vec<_> = batch.iter().map(|d| d.subroutine.as_str()).collect();
        let devices: Vec<_> = batch.iter().map(|d| d.device.as_str()).collect();
        debug!(?ids, ?devices, "handing subroutines to executor");

        self.executor.dispatch(batch).await
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}
