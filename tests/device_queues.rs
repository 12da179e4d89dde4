// tests/device_queues.rs

use rascal::engine::SubroutineOutcome;
use rascal::scheduler::SubroutineState;
use rascal_test_utils::builders::{RoutineBuilder, manual_scheduler};
use rascal_test_utils::capture_logs;

#[test]
fn create_then_delete_device_queue() {
    let (mut scheduler, _clock) = manual_scheduler();

    scheduler.create_device_queue("lamp1").unwrap();
    assert!(scheduler.active_routines().contains("lamp1"));
    assert!(scheduler.active_routines().get("lamp1").unwrap().is_empty());

    scheduler.delete_device_queue("lamp1").unwrap();
    assert!(!scheduler.active_routines().contains("lamp1"));
}

#[test]
fn deleting_unknown_queue_is_harmless() {
    let (mut scheduler, _clock) = manual_scheduler();

    scheduler.create_device_queue("lamp1").unwrap();
    scheduler.delete_device_queue("lamp1").unwrap();

    let (step, logs) = capture_logs(|| scheduler.delete_device_queue("lamp1").unwrap());
    assert!(step.is_empty());
    assert!(scheduler.active_routines().is_empty());

    let warning = logs
        .lines()
        .find(|line| line.contains("Unable to delete unknown queue"))
        .unwrap_or_else(|| panic!("no warning logged, got:\n{logs}"));
    assert!(warning.contains("WARN"));
    assert!(warning.contains("device=lamp1"));
}

#[test]
fn recreating_idle_queue_keeps_it_empty() {
    let (mut scheduler, _clock) = manual_scheduler();
    scheduler.create_device_queue("lamp1").unwrap();

    let step = scheduler.create_device_queue("lamp1").unwrap();
    assert!(step.is_empty());
    assert_eq!(scheduler.active_routines().len(), 1);
}

#[test]
fn recreating_busy_queue_cancels_its_routine() {
    let (mut scheduler, _clock) = manual_scheduler();
    scheduler.create_device_queue("lamp1").unwrap();

    let routine = RoutineBuilder::new("r1")
        .action("lamp1", "light.turn_on")
        .action("lamp1", "light.turn_off")
        .build();
    let step = scheduler.schedule_routine(routine).unwrap();
    let active = step.dispatched[0].subroutine.clone();

    let step = scheduler.create_device_queue("lamp1").unwrap();
    assert_eq!(step.aborted, vec![active.clone()]);
    assert_eq!(step.cancelled, vec!["r1".to_string()]);

    assert!(scheduler.is_idle());
    assert!(scheduler.ready_routines().is_empty());
    assert!(scheduler.active_routines().get("lamp1").unwrap().is_empty());
    assert_eq!(scheduler.state_of(&active), None);
}

#[test]
fn deleting_busy_queue_cancels_its_routine_only() {
    let (mut scheduler, _clock) = manual_scheduler();
    scheduler.create_device_queue("lamp1").unwrap();
    scheduler.create_device_queue("fan").unwrap();

    scheduler
        .schedule_routine(RoutineBuilder::new("lights").action("lamp1", "light.turn_on").build())
        .unwrap();
    let fan = scheduler
        .schedule_routine(RoutineBuilder::new("air").action("fan", "fan.turn_on").build())
        .unwrap();

    let step = scheduler.delete_device_queue("lamp1").unwrap();
    assert_eq!(step.cancelled, vec!["lights".to_string()]);
    assert!(scheduler.routine("lights").is_none());

    let fan_sub = &fan.dispatched[0].subroutine;
    assert_eq!(scheduler.state_of(fan_sub), Some(SubroutineState::Active));

    let step = scheduler
        .handle_completion(fan_sub, SubroutineOutcome::Success)
        .unwrap();
    assert_eq!(step.retired, vec!["air".to_string()]);
    assert!(scheduler.is_idle());
}

#[test]
fn ready_work_survives_queue_removal_and_resumes_on_return() {
    let (mut scheduler, _clock) = manual_scheduler();
    scheduler.create_device_queue("lamp1").unwrap();
    scheduler.create_device_queue("fan").unwrap();

    // Occupy the fan so the second routine sits in the ready tier.
    scheduler
        .schedule_routine(RoutineBuilder::new("first").action("fan", "fan.turn_on").build())
        .unwrap();
    scheduler
        .schedule_routine(RoutineBuilder::new("second").action("fan", "fan.turn_off").build())
        .unwrap();
    let waiting = scheduler.subroutines_of("second")[0].to_string();

    scheduler.delete_device_queue("fan").unwrap();
    assert!(scheduler.routine("first").is_none());
    assert_eq!(scheduler.state_of(&waiting), Some(SubroutineState::Ready));

    let step = scheduler.create_device_queue("fan").unwrap();
    assert_eq!(step.dispatched_ids(), vec![waiting.as_str()]);
}
