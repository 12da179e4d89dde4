// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender,
//! so tests can swap in a fake executor.
//!
//! - `SimulatedExecutorBackend` is what the `rascal` binary uses. It wraps
//!   the [`spawn_executor`] loop, logs every action and reports success
//!   after a fixed per-action delay.
//! - Tests provide their own backends that record dispatches and emit
//!   `SubroutineCompleted` events directly.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::engine::SchedulerEvent;
use crate::errors::{Error, Result};
use crate::model::SubroutineId;
use crate::scheduler::Dispatch;

use super::executor_loop::{ExecutorRequest, spawn_executor};

/// Trait abstracting how dispatched subroutines are carried out.
pub trait ExecutorBackend: Send {
    /// Start executing the given subroutines.
    fn dispatch(
        &mut self,
        batch: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop the given in-flight subroutines. No completion is expected
    /// for them afterwards.
    fn abort(
        &mut self,
        subroutines: Vec<SubroutineId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor backend that simulates device commands.
pub struct SimulatedExecutorBackend {
    tx: mpsc::Sender<ExecutorRequest>,
}

impl SimulatedExecutorBackend {
    /// Spawn the background executor loop and wire it to the runtime
    /// event sender.
    pub fn new(runtime_tx: mpsc::Sender<SchedulerEvent>, action_duration: Duration) -> Self {
        let tx = spawn_executor(runtime_tx, action_duration);
        Self { tx }
    }
}

impl ExecutorBackend for SimulatedExecutorBackend {
    fn dispatch(
        &mut self,
        batch: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for dispatch in batch {
                tx.send(ExecutorRequest::Run(dispatch))
                    .await
                    .map_err(Error::from)?;
            }
            Ok(())
        })
    }

    fn abort(
        &mut self,
        subroutines: Vec<SubroutineId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for id in subroutines {
                tx.send(ExecutorRequest::Abort(id))
                    .await
                    .map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
