// src/exec/executor_loop.rs

//! Background loop that manages in-flight subroutines.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::SchedulerEvent;
use crate::exec::action_runner::run_dispatch;
use crate::model::SubroutineId;
use crate::scheduler::Dispatch;

/// Request sent to the executor loop.
#[derive(Debug)]
pub enum ExecutorRequest {
    Run(Dispatch),
    Abort(SubroutineId),
}

/// Internal handle for a subroutine being played out.
///
/// - `cancel` stops the runner (used when the scheduler aborts it).
/// - `handle` is the Tokio task running it.
struct InFlight {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// Each dispatch runs in its own Tokio task and **per subroutine id there is
/// never more than one runner**: a second `Run` for an id that is still in
/// flight is ignored.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    action_duration: Duration,
) -> mpsc::Sender<ExecutorRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecutorRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut in_flight: HashMap<SubroutineId, InFlight> = HashMap::new();

        while let Some(request) = rx.recv().await {
            in_flight.retain(|_, f| !f.handle.is_finished());

            match request {
                ExecutorRequest::Run(dispatch) => {
                    start_dispatch(dispatch, action_duration, &mut in_flight, &runtime_tx)
                }
                ExecutorRequest::Abort(id) => abort_dispatch(&id, &mut in_flight),
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn start_dispatch(
    dispatch: Dispatch,
    action_duration: Duration,
    in_flight: &mut HashMap<SubroutineId, InFlight>,
    runtime_tx: &mpsc::Sender<SchedulerEvent>,
) {
    let id = dispatch.subroutine.clone();

    if in_flight.contains_key(&id) {
        warn!(subroutine = %id, "subroutine already in flight; ignoring duplicate dispatch");
        return;
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let spawn_id = id.clone();

    let handle = tokio::spawn(async move {
        run_dispatch(dispatch, action_duration, rt_tx, cancel_rx).await;
        debug!(subroutine = %spawn_id, "runner future finished");
    });

    in_flight.insert(
        id,
        InFlight {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn abort_dispatch(id: &str, in_flight: &mut HashMap<SubroutineId, InFlight>) {
    let Some(mut flight) = in_flight.remove(id) else {
        debug!(subroutine = %id, "abort for subroutine not in flight");
        return;
    };

    info!(subroutine = %id, "cancelling in-flight subroutine");
    if let Some(cancel) = flight.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(subroutine = %id, "runner already finished while cancelling");
        }
    }
}
