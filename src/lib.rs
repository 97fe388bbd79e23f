// src/lib.rs

pub mod cases;
pub mod channel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod present;
pub mod protocol;
pub mod runner;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cases::{CaseKeyPattern, FsCaseStore};
use crate::channel::ChannelServer;
use crate::cli::{CliArgs, Mode};
use crate::config::{load_or_default, ConfigFile};
use crate::engine::signals::{spawn_shutdown_forwarder, wait_for_shutdown_signal};
use crate::engine::{EngineEvent, Runtime, WatchController};
use crate::exec::ProcessSupervisor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::present::{ConsolePresenter, Presenter};
use crate::runner::{Orchestrator, RunSettings};
use crate::types::RunTarget;
use crate::watch::{collect_source_files, ContentFilter, Debouncer, SourcePatterns, TargetResolver};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - channel server, process supervisor, case store and presenter
/// - orchestrator
/// - (watch mode) file watcher, controller and runtime loop
/// - Ctrl-C / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    let mode = args.mode();

    let root = match &mode {
        Mode::Watch(root) => root.canonicalize().unwrap_or_else(|_| root.clone()),
        Mode::Once(_) => PathBuf::from("."),
    };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let patterns = Arc::new(SourcePatterns::from_config(&root, &cfg)?);
    let resolver = TargetResolver::new(Arc::clone(&fs), Arc::clone(&patterns));

    if args.dry_run {
        let target = match &mode {
            Mode::Once(path) => resolve_once(&resolver, path.as_deref())?,
            Mode::Watch(_) => None,
        };
        print_dry_run(&cfg, &root, &mode, target.as_ref());
        return Ok(());
    }

    let server = Arc::new(ChannelServer::start(&cfg.channel).await?);
    let presenter: Arc<dyn Presenter> = Arc::new(ConsolePresenter::new());
    let orchestrator = build_orchestrator(
        &cfg,
        &root,
        Arc::clone(&server),
        Arc::clone(&patterns),
        Arc::clone(&fs),
        Arc::clone(&presenter),
        args.part,
    )?;

    let result = match mode {
        Mode::Once(path) => run_once(&orchestrator, &resolver, path.as_deref()).await,
        Mode::Watch(_) => {
            let filter = cfg
                .watch
                .use_hash
                .then(|| seeded_filter(Arc::clone(&fs), &patterns));
            let controller = WatchController::new(
                orchestrator,
                resolver,
                Debouncer::new(cfg.watch.debounce()),
                filter,
            );
            run_watch(controller, &root).await
        }
    };

    server.shutdown();
    result
}

fn build_orchestrator(
    cfg: &ConfigFile,
    root: &Path,
    server: Arc<ChannelServer>,
    patterns: Arc<SourcePatterns>,
    fs: Arc<dyn FileSystem>,
    presenter: Arc<dyn Presenter>,
    part: Option<u32>,
) -> Result<Orchestrator> {
    let supervisor = ProcessSupervisor::new(
        server,
        Arc::clone(&patterns),
        cfg.runners().clone(),
        Arc::clone(&presenter),
        cfg.timeouts.clone(),
    );

    let cases_dir = if cfg.cases.dir.is_absolute() {
        cfg.cases.dir.clone()
    } else {
        root.join(&cfg.cases.dir)
    };
    let store = FsCaseStore::new(
        Arc::clone(&fs),
        cases_dir,
        CaseKeyPattern::new(&cfg.cases.path_pattern)?,
    );

    Ok(Orchestrator::new(
        Arc::new(supervisor),
        Arc::new(store),
        presenter,
        patterns,
        fs,
        RunSettings::from_config(cfg, part),
    ))
}

fn resolve_once(resolver: &TargetResolver, path: Option<&Path>) -> Result<Option<RunTarget>> {
    match path {
        Some(path) => resolver.resolve(path),
        None => Ok(resolver.most_recent_source()?.map(RunTarget::File)),
    }
}

/// One-shot mode. Mismatched answers are not an error.
async fn run_once(
    orchestrator: &Orchestrator,
    resolver: &TargetResolver,
    path: Option<&Path>,
) -> Result<()> {
    let Some(target) = resolve_once(resolver, path)? else {
        anyhow::bail!("no solution source found to run");
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if wait_for_shutdown_signal().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let outcome = orchestrator.run(target, cancel).await;
    debug!(cancelled = outcome.is_cancelled(), "one-shot run finished");
    Ok(())
}

async fn run_watch(controller: WatchController, root: &Path) -> Result<()> {
    let (tx, rx) = mpsc::channel::<EngineEvent>(64);

    let _watcher = crate::watch::spawn_watcher(root, tx.clone())?;
    spawn_shutdown_forwarder(tx);

    info!(root = %root.display(), "watching for changes");
    Runtime::new(controller, rx).run().await?;
    Ok(())
}

/// Content filter primed with every source under the root, so the first
/// no-op save after startup is already recognised as one.
fn seeded_filter(fs: Arc<dyn FileSystem>, patterns: &SourcePatterns) -> ContentFilter {
    let sources = collect_source_files(fs.as_ref(), patterns.root(), patterns).unwrap_or_else(|err| {
        warn!(error = %err, "could not list sources to seed content hashes");
        Vec::new()
    });
    let mut filter = ContentFilter::new(fs);
    for source in sources.iter() {
        filter.remember(source);
    }
    debug!(seeded = sources.len(), "content hashes seeded");
    filter
}

/// Print the resolved config and target without starting anything.
fn print_dry_run(cfg: &ConfigFile, root: &Path, mode: &Mode, target: Option<&RunTarget>) {
    println!("solwatch dry-run");
    match mode {
        Mode::Once(_) => match target {
            Some(target) => println!("  mode = once, target = {target}"),
            None => println!("  mode = once, target = (nothing to run)"),
        },
        Mode::Watch(_) => println!("  mode = watch, root = {}", root.display()),
    }
    println!(
        "  watch.debounce_ms = {}, watch.use_hash = {}",
        cfg.watch.debounce_ms, cfg.watch.use_hash
    );
    if !cfg.watch.exclude.is_empty() {
        println!("  watch.exclude = {:?}", cfg.watch.exclude);
    }
    println!(
        "  channel = {}:{} (+{} attempts), max frame {} bytes",
        cfg.channel.host, cfg.channel.base_port, cfg.channel.port_attempts, cfg.channel.max_frame_bytes
    );
    println!(
        "  timeouts: connect {}ms, poll {}ms, terminate grace {}ms, exit {}ms",
        cfg.timeouts.connect_ms,
        cfg.timeouts.poll_ms,
        cfg.timeouts.terminate_grace_ms,
        cfg.timeouts.exit_ms
    );
    println!(
        "  cases: dir = {}, path_pattern = {}",
        cfg.cases.dir.display(),
        cfg.cases.path_pattern
    );
    println!();

    println!("runners ({}):", cfg.runners().len());
    for (name, runner) in cfg.runners().iter() {
        println!("  - {name}");
        println!("      cmd: {}", runner.cmd.join(" "));
        println!("      patterns: {:?}", runner.patterns);
    }

    debug!("dry-run complete (no execution)");
}
