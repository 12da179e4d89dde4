// tests/decomposition.rs

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

use rascal::dag::{Decomposer, SubroutineGraph};
use rascal::errors::RascalError;
use rascal::model::id::MIN_SUFFIX_LEN;
use rascal::model::{Action, ActionPayload, Routine, Subroutine, Variables};
use rascal_test_utils::builders::{RoutineBuilder, action, t0, targeted_action};

fn three_step_routine() -> Routine {
    three_step(t0())
}

fn three_step(trigger_time: DateTime<Utc>) -> Routine {
    RoutineBuilder::new("r1")
        .action("lamp1", "light.turn_on")
        .action("lamp1", "light.turn_off")
        .action("fan", "fan.turn_on")
        .at(trigger_time)
        .build()
}

#[test]
fn three_steps_yield_staggered_cumulative_subroutines() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    assert_eq!(subs.len(), 3);

    let starts: Vec<_> = subs.iter().map(|s| s.start_time()).collect();
    assert_eq!(
        starts,
        vec![
            t0(),
            t0() + TimeDelta::seconds(10),
            t0() + TimeDelta::seconds(20)
        ]
    );

    let counts: Vec<_> = subs.iter().map(|s| s.actions().len()).collect();
    assert_eq!(counts, vec![1, 2, 3]);

    // Each subroutine dispatches only its own step.
    for s in &subs {
        assert_eq!(s.frontier().len(), 1);
        assert_eq!(s.routine(), "r1");
    }
    assert_eq!(subs[2].target().as_deref(), Some("fan"));
}

#[test]
fn start_times_strictly_increase_with_custom_increment() {
    let routine = three_step_routine();
    let decomposer = Decomposer::with_step_increment(TimeDelta::milliseconds(250));
    let subs = decomposer.decompose(&routine).unwrap();

    for pair in subs.windows(2) {
        assert_eq!(
            pair[1].start_time() - pair[0].start_time(),
            TimeDelta::milliseconds(250)
        );
    }
}

#[test]
fn non_positive_increment_falls_back_to_default() {
    let decomposer = Decomposer::with_step_increment(TimeDelta::zero());
    assert_eq!(decomposer.step_increment(), TimeDelta::seconds(10));
}

#[test]
fn empty_script_yields_no_subroutines() {
    let routine = RoutineBuilder::new("empty").build();
    let subs = Decomposer::default().decompose(&routine).unwrap();
    assert!(subs.is_empty());
}

#[test]
fn generated_ids_carry_routine_prefix_and_unique_suffix() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    let mut ids = std::collections::HashSet::new();
    for s in &subs {
        let suffix = s
            .id()
            .strip_prefix("r1-")
            .unwrap_or_else(|| panic!("id '{}' lacks routine prefix", s.id()));
        assert_eq!(suffix.len(), MIN_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert!(ids.insert(s.id().to_string()), "duplicate id {}", s.id());
    }
}

#[test]
fn suffix_grows_with_parent_id() {
    let routine = RoutineBuilder::new("morning_routine")
        .action("lamp1", "light.turn_on")
        .build();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    let suffix = subs[0].id().strip_prefix("morning_routine-").unwrap();
    assert_eq!(suffix.len(), "morning_routine".len());
}

#[test]
fn explicit_subroutine_id_is_kept() {
    let routine = three_step_routine();
    let action = Action::new(None, action("lamp1", "light.turn_on"), "r1", t0());
    let sub = Subroutine::new(Some("custom".to_string()), vec![action], &routine, t0());

    assert_eq!(sub.id(), "custom");
    assert_eq!(sub.actions()[0].id(), Some("custom-0"));
}

#[test]
fn explicit_action_id_is_kept() {
    let routine = three_step_routine();
    let named = Action::new(
        Some("keep-me".to_string()),
        action("lamp1", "light.turn_on"),
        "r1",
        t0(),
    );
    let unnamed = Action::new(None, action("lamp1", "light.turn_off"), "r1", t0());
    let sub = Subroutine::new(None, vec![named, unnamed], &routine, t0());

    let expected = format!("{}-1", sub.id());
    assert_eq!(sub.actions()[0].id(), Some("keep-me"));
    assert_eq!(sub.actions()[1].id(), Some(expected.as_str()));
}

#[test]
fn action_ids_stay_stable_across_the_prefix() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    let first = subs[0].actions()[0].id().unwrap().to_string();
    assert!(first.starts_with(subs[0].id()));
    assert_eq!(subs[1].actions()[0].id(), Some(first.as_str()));
    assert_eq!(subs[2].actions()[0].id(), Some(first.as_str()));
}

#[test]
fn actions_inherit_step_start_time() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    let frontier_starts: Vec<_> = subs.iter().map(|s| s.frontier()[0].start_time()).collect();
    let sub_starts: Vec<_> = subs.iter().map(|s| s.start_time()).collect();
    assert_eq!(frontier_starts, sub_starts);
}

#[test]
fn missing_target_is_rejected() {
    let mut payload = ActionPayload::new();
    payload.insert("service".to_string(), json!("scene.turn_on"));

    let routine = RoutineBuilder::new("r1")
        .action("lamp1", "light.turn_on")
        .payload(payload)
        .build();

    match Decomposer::default().decompose(&routine) {
        Err(RascalError::MissingTarget { routine, step }) => {
            assert_eq!(routine, "r1");
            assert_eq!(step, 1);
        }
        other => panic!("Expected MissingTarget, got {other:?}"),
    }
}

#[test]
fn nested_target_form_is_understood() {
    let routine = RoutineBuilder::new("r1")
        .payload(targeted_action("fan", "fan.turn_on"))
        .build();
    let subs = Decomposer::default().decompose(&routine).unwrap();
    assert_eq!(subs[0].target().as_deref(), Some("fan"));
}

#[test]
fn predecessors_chain_through_the_script() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();

    assert!(subs[0].predecessors().is_empty());
    assert_eq!(subs[1].predecessors(), &[subs[0].id().to_string()]);
    assert_eq!(subs[2].predecessors(), &[subs[1].id().to_string()]);
}

#[test]
fn graph_orders_subroutines_by_dependency() {
    let routine = three_step_routine();
    let subs = Decomposer::default().decompose(&routine).unwrap();
    let graph = SubroutineGraph::from_subroutines(&subs).unwrap();

    let expected: Vec<_> = subs.iter().map(|s| s.id().to_string()).collect();
    assert_eq!(graph.topological_order(), expected.as_slice());
    assert_eq!(graph.roots(), vec![subs[0].id()]);
    assert_eq!(graph.dependents_of(subs[0].id()), &[subs[1].id().to_string()]);
    assert_eq!(graph.dependencies_of(subs[2].id()), &[subs[1].id().to_string()]);
}

#[test]
fn graph_rejects_cycles() {
    let routine = Routine::new("r1", Vec::new(), Variables::new(), None, t0());
    let a = Subroutine::new(Some("a".into()), Vec::new(), &routine, t0())
        .with_predecessors(vec!["b".into()]);
    let b = Subroutine::new(Some("b".into()), Vec::new(), &routine, t0())
        .with_predecessors(vec!["a".into()]);

    match SubroutineGraph::from_subroutines(&[a, b]) {
        Err(RascalError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
        other => panic!("Expected DagCycle, got {other:?}"),
    }
}

#[test]
fn graph_rejects_unknown_predecessor() {
    let routine = Routine::new("r1", Vec::new(), Variables::new(), None, t0());
    let a = Subroutine::new(Some("a".into()), Vec::new(), &routine, t0())
        .with_predecessors(vec!["ghost".into()]);

    assert!(matches!(
        SubroutineGraph::from_subroutines(&[a]),
        Err(RascalError::SubroutineNotFound(id)) if id == "ghost"
    ));
}

#[test]
fn single_step_ignores_huge_increment() {
    let routine = RoutineBuilder::new("r1")
        .action("lamp1", "light.turn_on")
        .build();
    let subs = Decomposer::with_step_increment(TimeDelta::MAX)
        .decompose(&routine)
        .unwrap();

    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].start_time(), t0());
}

#[test]
fn overflowing_step_is_an_error() {
    let routine = three_step_routine();

    match Decomposer::with_step_increment(TimeDelta::MAX).decompose(&routine) {
        Err(RascalError::StartTimeOverflow { routine, step }) => {
            assert_eq!(routine, "r1");
            assert_eq!(step, 1);
        }
        other => panic!("Expected StartTimeOverflow, got {other:?}"),
    }
}

#[test]
fn trigger_near_end_of_time_is_an_error() {
    let routine = three_step(DateTime::<Utc>::MAX_UTC);

    assert!(matches!(
        Decomposer::default().decompose(&routine),
        Err(RascalError::StartTimeOverflow { step: 1, .. })
    ));
}
