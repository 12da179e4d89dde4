// tests/runtime_fake_executor.rs

use std::error::Error;
use std::sync::{Arc, Mutex};

use chrono::TimeDelta;
use tokio::sync::mpsc;

use rascal::clock::SystemClock;
use rascal::dag::Decomposer;
use rascal::engine::{
    CoreCommand, CoreRuntime, Runtime, RuntimeOptions, SchedulerEvent, SubroutineOutcome,
};
use rascal::scheduler::Scheduler;
use rascal_test_utils::builders::{RoutineBuilder, manual_scheduler};
use rascal_test_utils::fake_executor::{ExecutorLog, FakeExecutor};
use rascal_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn fast_scheduler() -> Scheduler {
    Scheduler::new(
        Decomposer::with_step_increment(TimeDelta::milliseconds(20)),
        Arc::new(SystemClock),
    )
}

fn once() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

async fn register(tx: &mpsc::Sender<SchedulerEvent>, devices: &[&str]) -> TestResult {
    for d in devices {
        tx.send(SchedulerEvent::DeviceRegistered {
            device: d.to_string(),
        })
        .await?;
    }
    Ok(())
}

#[tokio::test]
async fn runtime_plays_routine_in_order_and_exits_when_idle() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    register(&tx, &["lamp1", "fan"]).await?;
    tx.send(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("morning")
            .action("lamp1", "light.turn_on")
            .action("lamp1", "light.turn_off")
            .action("fan", "fan.turn_on")
            .request(),
    ))
    .await?;

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(
        log.executed(),
        vec![
            ("lamp1".to_string(), "light.turn_on".to_string()),
            ("lamp1".to_string(), "light.turn_off".to_string()),
            ("fan".to_string(), "fan.turn_on".to_string()),
        ]
    );
    assert!(log.aborted.is_empty());
    assert!(log.dispatched.iter().all(|d| d.routine == "morning"));
    Ok(())
}

#[tokio::test]
async fn runtime_interleaves_routines_on_separate_devices() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    register(&tx, &["lamp1", "fan"]).await?;
    for (id, device, service) in [("a", "lamp1", "light.turn_on"), ("b", "fan", "fan.turn_on")] {
        tx.send(SchedulerEvent::RoutineTriggered(
            RoutineBuilder::new(id)
                .action(device, service)
                .action(device, service)
                .request(),
        ))
        .await?;
    }

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.dispatched.len(), 4);
    let per_device = |device: &str| {
        log.dispatched
            .iter()
            .filter(|d| d.device == device)
            .count()
    };
    assert_eq!(per_device("lamp1"), 2);
    assert_eq!(per_device("fan"), 2);
    Ok(())
}

#[tokio::test]
async fn runtime_stops_routine_after_failure() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log)).failing_on("fan");

    register(&tx, &["lamp1", "fan"]).await?;
    tx.send(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("r1")
            .action("fan", "fan.turn_on")
            .action("lamp1", "light.turn_on")
            .request(),
    ))
    .await?;

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.executed(), vec![("fan".to_string(), "fan.turn_on".to_string())]);
    assert!(log.aborted.is_empty());
    Ok(())
}

#[tokio::test]
async fn runtime_aborts_in_flight_subroutine_on_cancel() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    register(&tx, &["lamp1"]).await?;
    tx.send(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("r1")
            .action("lamp1", "light.turn_on")
            .action("lamp1", "light.turn_off")
            .request(),
    ))
    .await?;
    tx.send(SchedulerEvent::RoutineCancelled {
        routine: "r1".to_string(),
    })
    .await?;

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.dispatched.len(), 1);
    assert_eq!(log.aborted, vec![log.dispatched[0].subroutine.clone()]);
    Ok(())
}

#[tokio::test]
async fn runtime_stops_on_shutdown_request() -> TestResult {
    let (tx, rx) = mpsc::channel(8);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    tx.send(SchedulerEvent::ShutdownRequested).await?;

    let runtime = Runtime::new(
        CoreRuntime::new(fast_scheduler(), RuntimeOptions::default()),
        rx,
        executor,
    );
    with_timeout(runtime.run()).await?;

    assert!(log.lock().unwrap().dispatched.is_empty());
    Ok(())
}

#[tokio::test]
async fn runtime_exits_when_device_removal_cancels_last_routine() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log)).holding();

    register(&tx, &["lamp1"]).await?;
    tx.send(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("r1")
            .action("lamp1", "light.turn_on")
            .request(),
    ))
    .await?;
    tx.send(SchedulerEvent::DeviceRemoved {
        device: "lamp1".to_string(),
    })
    .await?;

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    let log = log.lock().unwrap();
    assert_eq!(log.dispatched.len(), 1);
    assert_eq!(log.aborted, vec![log.dispatched[0].subroutine.clone()]);
    Ok(())
}

#[tokio::test]
async fn runtime_exits_after_empty_routine() -> TestResult {
    let (tx, rx) = mpsc::channel(8);
    let log = Arc::new(Mutex::new(ExecutorLog::default()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&log));

    tx.send(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("noop").request(),
    ))
    .await?;

    let runtime = Runtime::new(CoreRuntime::new(fast_scheduler(), once()), rx, executor);
    with_timeout(runtime.run()).await?;

    assert!(log.lock().unwrap().dispatched.is_empty());
    Ok(())
}

#[test]
fn core_keeps_running_while_registering_devices() {
    let (scheduler, _clock) = manual_scheduler();
    let mut core = CoreRuntime::new(scheduler, once());

    for device in ["lamp1", "fan"] {
        let step = core.step(SchedulerEvent::DeviceRegistered {
            device: device.to_string(),
        });
        assert!(step.keep_running);
        assert!(step.commands.is_empty());
    }
}

#[test]
fn core_exits_when_device_replacement_cancels_last_routine() {
    let (scheduler, _clock) = manual_scheduler();
    let mut core = CoreRuntime::new(scheduler, once());
    core.step(SchedulerEvent::DeviceRegistered {
        device: "lamp1".to_string(),
    });
    core.step(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("r1")
            .action("lamp1", "light.turn_on")
            .request(),
    ));

    let step = core.step(SchedulerEvent::DeviceRegistered {
        device: "lamp1".to_string(),
    });
    assert!(!step.keep_running);
    assert!(matches!(step.commands.as_slice(), [CoreCommand::Abort(_), CoreCommand::RequestExit]));
}

#[test]
fn core_emits_dispatch_then_exit_command() {
    let (scheduler, _clock) = manual_scheduler();
    let mut core = CoreRuntime::new(scheduler, once());

    let step = core.step(SchedulerEvent::DeviceRegistered {
        device: "lamp1".to_string(),
    });
    assert!(step.keep_running);
    assert!(step.commands.is_empty());

    let step = core.step(SchedulerEvent::RoutineTriggered(
        RoutineBuilder::new("r1")
            .action("lamp1", "light.turn_on")
            .request(),
    ));
    let dispatched = match step.commands.as_slice() {
        [CoreCommand::Dispatch(batch)] => batch[0].subroutine.clone(),
        other => panic!("Expected a single dispatch, got {other:?}"),
    };

    let step = core.step(SchedulerEvent::SubroutineCompleted {
        subroutine: dispatched,
        outcome: SubroutineOutcome::Success,
    });
    assert!(!step.keep_running);
    assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
    assert!(core.is_idle());
}

#[test]
fn core_survives_rejected_trigger() {
    let (scheduler, _clock) = manual_scheduler();
    let mut core = CoreRuntime::new(scheduler, once());
    core.step(SchedulerEvent::DeviceRegistered {
        device: "lamp1".to_string(),
    });

    let request = RoutineBuilder::new("r1")
        .action("lamp1", "light.turn_on")
        .request();
    core.step(SchedulerEvent::RoutineTriggered(request.clone()));

    let step = core.step(SchedulerEvent::RoutineTriggered(request));
    assert!(step.keep_running);
    assert!(step.commands.is_empty());
    assert!(core.scheduler().routine("r1").is_some());
}
