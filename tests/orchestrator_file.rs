// tests/orchestrator_file.rs

mod common;
use crate::common::{
    fast_settings, init_tracing, orchestrator, replying_child, script, summing_child,
    with_timeout, ConfigFileBuilder, MemoryCaseStore, RecordingPresenter, ScriptedLauncher,
    TestCaseBuilder,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use solwatch::channel::ChildEnd;
use solwatch::errors::RunFailure;
use solwatch::fs::mock::MockFileSystem;
use solwatch::present::ProgressEvent;
use solwatch::protocol::{Aside, Outbound};
use solwatch::runner::{
    CaseStatus, CaseVerdict, FileOutcome, Orchestrator, PartVerdict, RunOutcome, RunSettings,
};
use solwatch::types::{RunTarget, TestCase};

fn source() -> PathBuf {
    PathBuf::from("2015/day01.py")
}

fn day01_cases() -> Vec<TestCase> {
    vec![
        TestCaseBuilder::example("1,2,3").answer(6).build(),
        TestCaseBuilder::main("4,5,6").answer(15).build(),
    ]
}

struct Harness {
    orchestrator: Orchestrator,
    launcher: Arc<ScriptedLauncher>,
    presenter: RecordingPresenter,
}

fn harness(launcher: ScriptedLauncher, cases: Vec<TestCase>, settings: RunSettings) -> Harness {
    let cfg = ConfigFileBuilder::new().build();
    let launcher = Arc::new(launcher);
    let presenter = RecordingPresenter::new();
    let store = MemoryCaseStore::new().with(source(), cases);
    let orchestrator = orchestrator(
        &cfg,
        launcher.clone(),
        Arc::new(store),
        Arc::new(presenter.clone()),
        Arc::new(MockFileSystem::new()),
        settings,
    );
    Harness {
        orchestrator,
        launcher,
        presenter,
    }
}

async fn run_file(h: &Harness) -> FileOutcome {
    let outcome = with_timeout(
        h.orchestrator
            .run(RunTarget::File(source()), CancellationToken::new()),
    )
    .await;
    match outcome {
        RunOutcome::File(f) => f,
        other => panic!("expected file outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn day01_end_to_end() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), summing_child()),
        day01_cases(),
        fast_settings(),
    );

    let outcome = run_file(&h).await;

    assert_eq!(outcome.cases.len(), 2);
    assert_eq!(outcome.cases[0].label, "example 1");
    assert_eq!(outcome.cases[0].verdict(), CaseVerdict::Pass);
    assert_eq!(outcome.cases[1].label, "main");
    assert_eq!(outcome.cases[1].verdict(), CaseVerdict::Pass);
    assert!(outcome.is_success());
    assert_eq!(outcome.failure, None);
    assert_eq!(outcome.correct_parts(), 1);
    assert!(h.presenter.failures().is_empty());

    assert_eq!(
        h.presenter.part_verdicts(),
        vec![
            ("example 1".to_string(), PartVerdict::Pass),
            ("main".to_string(), PartVerdict::Pass),
        ]
    );

    // One child for the whole file, and it exited cleanly.
    assert_eq!(h.launcher.spawned(), vec![source()]);
}

#[tokio::test]
async fn events_follow_the_run_lifecycle() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), summing_child()),
        day01_cases(),
        fast_settings(),
    );
    run_file(&h).await;

    let events = h.presenter.events();
    assert!(matches!(events.first(), Some(ProgressEvent::RunStarted { .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::FileFinished { .. })));

    let example_done = events
        .iter()
        .position(|e| {
            matches!(e, ProgressEvent::CaseFinished { outcome, .. } if outcome.label == "example 1")
        })
        .unwrap();
    let main_started = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::CaseStarted { label, .. } if label == "main"))
        .unwrap();
    assert!(example_done < main_started, "examples drain before main starts");
}

#[tokio::test]
async fn results_are_judged_positionally() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), replying_child(vec![json!(4), json!(9)], 0)),
        vec![TestCaseBuilder::main("x").answer(4).answer(8).build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    let main = outcome.main_case().unwrap();
    assert_eq!(main.verdicts(), vec![PartVerdict::Pass, PartVerdict::Fail]);
    assert_eq!(main.verdict(), CaseVerdict::Fail);
    assert_eq!(main.parts[1].expected, Some(json!(8)));
    assert_eq!(outcome.correct_parts(), 1);
}

#[tokio::test]
async fn unknown_answer_is_informational_never_fail() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), replying_child(vec![json!(4)], 0)),
        vec![TestCaseBuilder::main("x").build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    let main = outcome.main_case().unwrap();
    assert_eq!(main.verdicts(), vec![PartVerdict::Informational]);
    assert_eq!(main.verdict(), CaseVerdict::Informational);
    assert!(outcome.is_success());
}

#[tokio::test]
async fn null_expected_entry_is_unknown() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), replying_child(vec![json!(1), json!(2)], 0)),
        vec![TestCaseBuilder::main("x").unknown_answer().answer(2).build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    assert_eq!(
        outcome.main_case().unwrap().verdicts(),
        vec![PartVerdict::Informational, PartVerdict::Pass]
    );
}

#[tokio::test]
async fn nonzero_exit_overrides_a_pass() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), replying_child(vec![json!(4)], 1)),
        vec![TestCaseBuilder::main("x").answer(4).build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    let main = outcome.main_case().unwrap();
    assert_eq!(main.verdicts(), vec![PartVerdict::Pass]);
    assert_eq!(main.status, CaseStatus::Failed(RunFailure::ChildExitedNonZero(1)));
    assert_eq!(main.verdict(), CaseVerdict::Error);
    assert!(!outcome.is_success());
    assert_eq!(outcome.correct_parts(), 0);

    // Exactly one terminal marker for the file.
    assert_eq!(
        h.presenter.failures(),
        vec![(source(), RunFailure::ChildExitedNonZero(1))]
    );
}

#[tokio::test]
async fn crash_mid_case_marks_that_case_as_error() {
    init_tracing();
    let crashing = script(|mut end: ChildEnd| async move {
        if let Some(Outbound::Request(_)) = end.next_request().await {
            end.result(json!(6), 0.0).await;
        }
        // Dies before `done`.
        2
    });
    let h = harness(
        ScriptedLauncher::new().with_script(source(), crashing),
        day01_cases(),
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    assert_eq!(outcome.cases.len(), 1, "main never starts");
    assert_eq!(
        outcome.cases[0].status,
        CaseStatus::Failed(RunFailure::ChildExitedNonZero(2))
    );
    assert_eq!(outcome.failure, Some(RunFailure::ChildExitedNonZero(2)));
    assert_eq!(h.presenter.failures().len(), 1);
}

#[tokio::test]
async fn clean_exit_without_done_is_a_disconnect() {
    init_tracing();
    let quitter = script(|mut end: ChildEnd| async move {
        let _ = end.next_request().await;
        0
    });
    let h = harness(
        ScriptedLauncher::new().with_script(source(), quitter),
        vec![TestCaseBuilder::main("x").answer(1).build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    assert_eq!(outcome.failure, Some(RunFailure::Disconnected));
}

#[tokio::test]
async fn result_order_is_preserved() {
    init_tracing();
    let answers: Vec<Value> = (0..25).map(Value::from).collect();
    let h = harness(
        ScriptedLauncher::new().with_script(source(), replying_child(answers.clone(), 0)),
        vec![TestCaseBuilder::main("x").build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    let got: Vec<Value> = outcome.main_case().unwrap().parts.iter().map(|p| p.answer.clone()).collect();
    assert_eq!(got, answers);
    let numbers: Vec<u32> = outcome.main_case().unwrap().parts.iter().map(|p| p.part).collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<u32>>());
}

#[tokio::test]
async fn status_and_aside_reach_the_presenter() {
    init_tracing();
    let chatty = script(|mut end: ChildEnd| async move {
        while let Some(frame) = end.next_request().await {
            match frame {
                Outbound::Request(_) => {
                    end.status("parsing").await;
                    end.result_with_aside(
                        json!("abc"),
                        0.5,
                        Aside {
                            header: vec!["k".into()],
                            rows: vec![vec!["v".into()]],
                        },
                    )
                    .await;
                    end.done().await;
                }
                Outbound::Done => return 0,
            }
        }
        0
    });
    let h = harness(
        ScriptedLauncher::new().with_script(source(), chatty),
        vec![TestCaseBuilder::main("x").answer("abc").build()],
        fast_settings(),
    );

    let outcome = run_file(&h).await;
    assert_eq!(h.presenter.statuses(), vec!["parsing".to_string()]);
    let part = &outcome.main_case().unwrap().parts[0];
    assert_eq!(part.verdict, PartVerdict::Pass);
    assert_eq!(part.duration, Duration::from_millis(500));
    assert_eq!(part.aside.as_ref().unwrap().rows, vec![vec!["v".to_string()]]);
}

#[tokio::test]
async fn selected_part_shifts_expected_answers() {
    init_tracing();
    let seen_part = Arc::new(std::sync::Mutex::new(None));
    let recorder = seen_part.clone();
    let part_two = script(move |mut end: ChildEnd| {
        let recorder = recorder.clone();
        async move {
            while let Some(frame) = end.next_request().await {
                match frame {
                    Outbound::Request(req) => {
                        *recorder.lock().unwrap() = req.part;
                        end.result(json!(8), 0.0).await;
                        end.done().await;
                    }
                    Outbound::Done => return 0,
                }
            }
            0
        }
    });
    let settings = RunSettings {
        part: Some(2),
        ..fast_settings()
    };
    let h = harness(
        ScriptedLauncher::new().with_script(source(), part_two),
        vec![TestCaseBuilder::main("x").answer(4).answer(8).build()],
        settings,
    );

    let outcome = run_file(&h).await;
    assert_eq!(*seen_part.lock().unwrap(), Some(2));
    let part = &outcome.main_case().unwrap().parts[0];
    assert_eq!(part.part, 2);
    assert_eq!(part.verdict, PartVerdict::Pass);
}

#[tokio::test]
async fn missing_cases_fail_without_spawning() {
    init_tracing();
    let h = harness(
        ScriptedLauncher::new().with_fallback(summing_child()),
        day01_cases(),
        fast_settings(),
    );

    let other = PathBuf::from("2015/day02.py");
    let outcome = with_timeout(
        h.orchestrator
            .run(RunTarget::File(other.clone()), CancellationToken::new()),
    )
    .await;

    match outcome {
        RunOutcome::File(f) => {
            assert!(matches!(f.failure, Some(RunFailure::InputUnavailable(_))));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.launcher.spawned().is_empty());
    assert_eq!(h.presenter.failures().len(), 1);
}

#[tokio::test]
async fn child_that_hangs_after_done_is_terminated() {
    init_tracing();
    let lingering = script(|mut end: ChildEnd| async move {
        while let Some(frame) = end.next_request().await {
            if let Outbound::Request(_) = frame {
                end.result(json!(1), 0.0).await;
                end.done().await;
            }
        }
        // Ignores the final done and never exits on its own.
        std::future::pending::<i32>().await
    });
    let settings = RunSettings {
        exit: Duration::from_millis(100),
        ..fast_settings()
    };
    let h = harness(
        ScriptedLauncher::new().with_script(source(), lingering),
        vec![TestCaseBuilder::main("x").answer(1).build()],
        settings,
    );

    let outcome = run_file(&h).await;
    assert!(outcome.is_success(), "a pass stays a pass when we had to stop it");
    assert!(matches!(
        h.launcher.journal().last(),
        Some(solwatch_test_utils::LaunchEvent::Exited(_, solwatch::exec::ChildExit::Terminated))
    ));
}

#[tokio::test]
async fn cancel_during_exit_wait_after_final_done() {
    init_tracing();
    let closing = Arc::new(tokio::sync::Notify::new());
    let signal = closing.clone();
    let lingering = script(move |mut end: ChildEnd| {
        let signal = signal.clone();
        async move {
            while let Some(frame) = end.next_request().await {
                match frame {
                    Outbound::Request(_) => {
                        end.result(json!(15), 0.001).await;
                        end.done().await;
                    }
                    Outbound::Done => {
                        signal.notify_one();
                        return std::future::pending::<i32>().await;
                    }
                }
            }
            0
        }
    });
    let settings = RunSettings {
        exit: Duration::from_secs(30),
        ..fast_settings()
    };
    let h = harness(
        ScriptedLauncher::new().with_script(source(), lingering),
        vec![TestCaseBuilder::main("4,5,6").answer(15).build()],
        settings,
    );

    let cancel = CancellationToken::new();
    let run = {
        let orchestrator = h.orchestrator.clone();
        let token = cancel.clone();
        tokio::spawn(async move { orchestrator.run(RunTarget::File(source()), token).await })
    };

    // The final done has been sent, so the orchestrator is waiting for exit.
    with_timeout(closing.notified()).await;
    cancel.cancel();
    let outcome = with_timeout(run).await.unwrap();

    let RunOutcome::File(outcome) = outcome else {
        panic!("expected file outcome");
    };
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.failure, Some(RunFailure::Cancelled));
    assert_eq!(outcome.cases[0].status, CaseStatus::Cancelled);
    assert!(h.presenter.failures().is_empty());

    let events = h.presenter.events();
    assert!(matches!(events.last(), Some(ProgressEvent::RunCancelled { .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProgressEvent::FileFinished { .. })));
    assert!(matches!(
        h.launcher.journal().last(),
        Some(solwatch_test_utils::LaunchEvent::Exited(_, solwatch::exec::ChildExit::Terminated))
    ));
}
