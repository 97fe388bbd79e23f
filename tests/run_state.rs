// tests/run_state.rs

use std::time::Duration;

use serde_json::json;
use solwatch::errors::RunFailure;
use solwatch::runner::{CaseStatus, CaseVerdict, PartOutcome, PartVerdict, RunPhase, RunState};
use tokio_util::sync::CancellationToken;

fn part(verdict: PartVerdict) -> PartOutcome {
    PartOutcome {
        part: 1,
        answer: json!(1),
        expected: None,
        duration: Duration::from_millis(1),
        aside: None,
        verdict,
    }
}

#[test]
fn examples_then_main_then_done() {
    let mut state = RunState::new(CancellationToken::new());
    assert_eq!(state.phase(), RunPhase::Idle);

    assert!(state.begin_case("example 1", true));
    state.record_part(part(PartVerdict::Pass));
    assert_eq!(state.part_index(), 1);

    assert!(state.begin_case("example 2", true));
    assert_eq!(state.case_index(), 1);
    assert_eq!(state.part_index(), 0);

    assert!(state.begin_case("main", false));
    assert_eq!(state.phase(), RunPhase::RunningMain);
    assert_eq!(state.case_index(), 2);

    // No example once the main case has started.
    assert!(!state.begin_case("example 3", true));
    assert_eq!(state.phase(), RunPhase::RunningMain);

    assert!(state.finish());
    assert_eq!(state.phase(), RunPhase::Done);
    assert_eq!(state.into_outcomes().len(), 3);
}

#[test]
fn cancelled_is_reachable_from_running_phases_only() {
    let token = CancellationToken::new();
    let mut state = RunState::new(token.clone());

    assert!(!state.transition(RunPhase::Cancelled), "idle cannot be cancelled");
    assert!(!state.is_cancelled());

    state.begin_case("main", false);
    token.cancel();
    assert!(state.is_cancelled());

    state.mark_cancelled();
    assert_eq!(state.phase(), RunPhase::Cancelled);
    assert_eq!(state.current().unwrap().status, CaseStatus::Cancelled);
    assert_eq!(state.current().unwrap().verdict(), CaseVerdict::Cancelled);

    assert!(!state.finish(), "a cancelled run never completes");
}

#[test]
fn failure_overrides_passing_parts() {
    let mut state = RunState::new(CancellationToken::new());
    state.begin_case("main", false);
    state.record_part(part(PartVerdict::Pass));
    state.record_part(part(PartVerdict::Pass));

    assert_eq!(state.current().unwrap().verdict(), CaseVerdict::Pass);
    assert_eq!(state.current().unwrap().correct_parts(), 2);

    state.fail_current(RunFailure::ChildExitedNonZero(1));
    let case = state.current().unwrap();
    assert_eq!(case.verdict(), CaseVerdict::Error);
    assert_eq!(case.correct_parts(), 0);
}

#[test]
fn informational_parts_never_fail_a_case() {
    let mut state = RunState::new(CancellationToken::new());
    state.begin_case("example 1", true);
    state.record_part(part(PartVerdict::Informational));
    assert_eq!(state.current().unwrap().verdict(), CaseVerdict::Informational);

    state.record_part(part(PartVerdict::Fail));
    assert_eq!(state.current().unwrap().verdict(), CaseVerdict::Fail);
}
