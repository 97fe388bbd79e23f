// tests/single_flight.rs

mod common;
use crate::common::{
    fast_settings, init_tracing, orchestrator, script, summing_child, with_timeout,
    ConfigFileBuilder, LaunchEvent, MemoryCaseStore, RecordingPresenter, ScriptedLauncher,
    TestCaseBuilder,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use solwatch::channel::ChildEnd;
use solwatch::engine::WatchController;
use solwatch::exec::ChildExit;
use solwatch::fs::mock::MockFileSystem;
use solwatch::fs::FileSystem;
use solwatch::watch::{ContentFilter, Debouncer, SourcePatterns, TargetResolver};
use solwatch::types::RunTarget;

const A: &str = "2015/day01.py";
const B: &str = "2015/day02.py";

struct Setup {
    controller: WatchController,
    launcher: Arc<ScriptedLauncher>,
    presenter: RecordingPresenter,
    fs: MockFileSystem,
}

fn setup(launcher: ScriptedLauncher, use_hash: bool) -> Setup {
    let cfg = ConfigFileBuilder::new().build();
    let fs = MockFileSystem::new();
    fs.add_file(A, "a = 1");
    fs.add_file(B, "b = 2");
    fs.add_file("common/util.txt", "shared");

    let store = MemoryCaseStore::new()
        .with(A, vec![TestCaseBuilder::main("1,2").answer(3).build()])
        .with(B, vec![TestCaseBuilder::main("2,2").answer(4).build()]);

    let launcher = Arc::new(launcher);
    let presenter = RecordingPresenter::new();
    let shared_fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let orch = orchestrator(
        &cfg,
        launcher.clone(),
        Arc::new(store),
        Arc::new(presenter.clone()),
        shared_fs.clone(),
        fast_settings(),
    );
    let patterns = Arc::new(SourcePatterns::from_config(".", &cfg).unwrap());
    let resolver = TargetResolver::new(shared_fs.clone(), patterns);
    let filter = use_hash.then(|| ContentFilter::new(shared_fs));

    Setup {
        controller: WatchController::new(
            orch,
            resolver,
            Debouncer::new(Duration::from_millis(200)),
            filter,
        ),
        launcher,
        presenter,
        fs,
    }
}

/// Reports that it got a case, then works forever.
fn stuck_child(started: Arc<Notify>) -> solwatch_test_utils::Script {
    script(move |mut end: ChildEnd| {
        let started = started.clone();
        async move {
            let _ = end.next_request().await;
            started.notify_one();
            std::future::pending::<i32>().await
        }
    })
}

async fn wait_until_finished(controller: &WatchController) {
    with_timeout(async {
        while !controller.active().map(|a| a.is_finished()).unwrap_or(true) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
}

#[tokio::test]
async fn previous_child_exits_before_next_spawns() {
    init_tracing();
    let started = Arc::new(Notify::new());
    let mut s = setup(
        ScriptedLauncher::new().with_fallback(stuck_child(started.clone())),
        false,
    );
    let t0 = Instant::now();

    let first = s.controller.handle_change(Path::new(A), t0).await;
    assert_eq!(first, Some(RunTarget::File(PathBuf::from(A))));
    with_timeout(started.notified()).await;

    let second = s
        .controller
        .handle_change(Path::new(B), t0 + Duration::from_millis(10))
        .await;
    assert_eq!(second, Some(RunTarget::File(PathBuf::from(B))));
    with_timeout(started.notified()).await;

    s.controller.shutdown().await;

    assert_eq!(
        s.launcher.journal(),
        vec![
            LaunchEvent::Spawned(PathBuf::from(A)),
            LaunchEvent::Exited(PathBuf::from(A), ChildExit::Terminated),
            LaunchEvent::Spawned(PathBuf::from(B)),
            LaunchEvent::Exited(PathBuf::from(B), ChildExit::Terminated),
        ]
    );
    assert_eq!(s.presenter.cancelled_runs(), 2);
    assert!(s.presenter.failures().is_empty());
}

#[tokio::test]
async fn rapid_repeat_is_debounced() {
    init_tracing();
    let mut s = setup(ScriptedLauncher::new().with_fallback(summing_child()), false);
    let t0 = Instant::now();

    assert!(s.controller.handle_change(Path::new(A), t0).await.is_some());
    assert!(s
        .controller
        .handle_change(Path::new(A), t0 + Duration::from_millis(100))
        .await
        .is_none());
    s.controller.wait_active().await;

    assert_eq!(s.launcher.spawned(), vec![PathBuf::from(A)]);
}

#[tokio::test]
async fn cancelling_a_finished_run_is_a_no_op() {
    init_tracing();
    let mut s = setup(ScriptedLauncher::new().with_fallback(summing_child()), false);

    s.controller.start(RunTarget::File(PathBuf::from(A))).await;
    wait_until_finished(&s.controller).await;

    let outcome = s.controller.cancel_active().await.expect("finished run outcome");
    assert!(!outcome.is_cancelled());
    assert!(s.controller.cancel_active().await.is_none());
    s.controller.shutdown().await;

    assert_eq!(s.presenter.cancelled_runs(), 0);
    assert!(s.presenter.failures().is_empty());
}

#[tokio::test]
async fn non_source_edit_reruns_latest_source() {
    init_tracing();
    let mut s = setup(ScriptedLauncher::new().with_fallback(summing_child()), false);

    let target = s
        .controller
        .handle_change(Path::new("common/util.txt"), Instant::now())
        .await;
    assert_eq!(target, Some(RunTarget::File(PathBuf::from(B))));
    s.controller.wait_active().await;

    // Touch A: it becomes the most recent source.
    s.fs.add_file(A, "a = 11");
    let target = s
        .controller
        .handle_change(Path::new("common/util.txt"), Instant::now() + Duration::from_secs(1))
        .await;
    assert_eq!(target, Some(RunTarget::File(PathBuf::from(A))));
    s.controller.wait_active().await;
}

#[tokio::test]
async fn excluded_paths_never_start_a_run() {
    init_tracing();
    let mut s = setup(ScriptedLauncher::new().with_fallback(summing_child()), false);
    s.fs.add_file("target/debug/build.py", "");

    let target = s
        .controller
        .handle_change(Path::new("target/debug/build.py"), Instant::now())
        .await;
    assert_eq!(target, None);
    assert!(s.launcher.spawned().is_empty());
}

#[tokio::test]
async fn unchanged_content_is_skipped_with_hashing() {
    init_tracing();
    let mut s = setup(ScriptedLauncher::new().with_fallback(summing_child()), true);
    let t0 = Instant::now();

    assert!(s.controller.handle_change(Path::new(A), t0).await.is_some());
    s.controller.wait_active().await;

    // Same bytes, outside the debounce window.
    assert!(s
        .controller
        .handle_change(Path::new(A), t0 + Duration::from_secs(1))
        .await
        .is_none());

    s.fs.add_file(A, "a = 2");
    assert!(s
        .controller
        .handle_change(Path::new(A), t0 + Duration::from_secs(2))
        .await
        .is_some());
    s.controller.wait_active().await;

    assert_eq!(s.launcher.spawned().len(), 2);
}
