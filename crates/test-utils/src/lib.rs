pub mod builders;
pub mod case_store;
pub mod fake_launcher;
pub mod presenter;

use std::sync::{Arc, Once};
use std::time::Duration;

use solwatch::cases::CaseStore;
use solwatch::config::ConfigFile;
use solwatch::exec::Launcher;
use solwatch::fs::FileSystem;
use solwatch::present::Presenter;
use solwatch::runner::{Orchestrator, RunSettings};
use solwatch::watch::SourcePatterns;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, TestCaseBuilder};
pub use case_store::MemoryCaseStore;
pub use fake_launcher::{script, LaunchEvent, Script, ScriptedLauncher};
pub use presenter::RecordingPresenter;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Short timings so tests never sit on production defaults.
pub fn fast_settings() -> RunSettings {
    RunSettings {
        poll: Duration::from_millis(20),
        exit: Duration::from_millis(500),
        part: None,
    }
}

/// Wire an orchestrator out of test doubles. Source patterns come from `cfg`
/// with the watch root at `.`.
pub fn orchestrator(
    cfg: &ConfigFile,
    launcher: Arc<dyn Launcher>,
    cases: Arc<dyn CaseStore>,
    presenter: Arc<dyn Presenter>,
    fs: Arc<dyn FileSystem>,
    settings: RunSettings,
) -> Orchestrator {
    let patterns = SourcePatterns::from_config(".", cfg).expect("valid source patterns");
    Orchestrator::new(launcher, cases, presenter, Arc::new(patterns), fs, settings)
}
