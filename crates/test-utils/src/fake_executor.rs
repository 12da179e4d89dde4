use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use rascal::engine::{SchedulerEvent, SubroutineOutcome};
use rascal::errors::Result;
use rascal::exec::ExecutorBackend;
use rascal::model::SubroutineId;
use rascal::scheduler::Dispatch;

/// What the fake executor saw.
#[derive(Debug, Default, Clone)]
pub struct ExecutorLog {
    pub dispatched: Vec<Dispatch>,
    pub aborted: Vec<SubroutineId>,
}

impl ExecutorLog {
    /// `(device, service)` of every executed action, in dispatch order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.dispatched
            .iter()
            .flat_map(|d| {
                d.actions.iter().map(move |a| {
                    let service = a
                        .payload()
                        .get("service")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    (d.device.clone(), service)
                })
            })
            .collect()
    }
}

/// A fake executor that:
/// - records which subroutines were dispatched and aborted
/// - immediately reports completion for each dispatch, failing those aimed
///   at a device in `failing_devices`, unless it is `holding`, in which
///   case dispatched subroutines stay in flight until aborted.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    log: Arc<Mutex<ExecutorLog>>,
    failing_devices: HashSet<String>,
    holding: bool,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<SchedulerEvent>, log: Arc<Mutex<ExecutorLog>>) -> Self {
        Self {
            runtime_tx,
            log,
            failing_devices: HashSet::new(),
            holding: false,
        }
    }

    /// Never report completion.
    pub fn holding(mut self) -> Self {
        self.holding = true;
        self
    }

    pub fn failing_on(mut self, device: &str) -> Self {
        self.failing_devices.insert(device.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch(
        &mut self,
        batch: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let log = Arc::clone(&self.log);
        let failing = self.failing_devices.clone();
        let holding = self.holding;

        Box::pin(async move {
            for d in batch {
                log.lock().unwrap().dispatched.push(d.clone());
                if holding {
                    continue;
                }

                let outcome = if failing.contains(&d.device) {
                    SubroutineOutcome::Failed(format!("device {} refused", d.device))
                } else {
                    SubroutineOutcome::Success
                };

                tx.send(SchedulerEvent::SubroutineCompleted {
                    subroutine: d.subroutine.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn abort(
        &mut self,
        subroutines: Vec<SubroutineId>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            log.lock().unwrap().aborted.extend(subroutines);
            Ok(())
        })
    }
}
