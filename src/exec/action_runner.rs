// src/exec/action_runner.rs

//! Plays out a single dispatched subroutine.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::{SchedulerEvent, SubroutineOutcome};
use crate::scheduler::Dispatch;

/// Run every frontier action of `dispatch` in order, spending
/// `action_duration` on each, then report success.
///
/// If the cancel channel fires the run stops and **no** completion is
/// sent; the scheduler has already forgotten the subroutine.
pub async fn run_dispatch(
    dispatch: Dispatch,
    action_duration: Duration,
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    for action in &dispatch.actions {
        info!(
            subroutine = %dispatch.subroutine,
            device = %dispatch.device,
            action = action.id().unwrap_or("<unassigned>"),
            payload = %serde_json::Value::Object(action.payload().clone()),
            "executing action"
        );

        tokio::select! {
            _ = tokio::time::sleep(action_duration) => {}
            _ = &mut cancel_rx => {
                info!(subroutine = %dispatch.subroutine, "subroutine aborted");
                return;
            }
        }
    }

    debug!(subroutine = %dispatch.subroutine, "subroutine finished; reporting success");

    if runtime_tx
        .send(SchedulerEvent::SubroutineCompleted {
            subroutine: dispatch.subroutine.clone(),
            outcome: SubroutineOutcome::Success,
        })
        .await
        .is_err()
    {
        debug!(subroutine = %dispatch.subroutine, "runtime gone; completion dropped");
    }
}
