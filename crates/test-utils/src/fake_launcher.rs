use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use solwatch::channel::{ChildEnd, Connection};
use solwatch::errors::RunFailure;
use solwatch::exec::{BoxFuture, ChildExit, ChildHandle, ChildSession, Launcher};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// A fake child: gets the child's end of an in-memory connection and returns
/// the process exit code. Returning drops the connection, like a process
/// exiting.
pub type Script = Arc<dyn Fn(ChildEnd) -> BoxFuture<'static, i32> + Send + Sync>;

/// Wrap an async closure as a [`Script`].
pub fn script<F, Fut>(f: F) -> Script
where
    F: Fn(ChildEnd) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = i32> + Send + 'static,
{
    Arc::new(move |end| Box::pin(f(end)))
}

/// Lifecycle journal entry, in the order things happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    Spawned(PathBuf),
    Exited(PathBuf, ChildExit),
}

/// A fake `Launcher` whose children are scripted tasks.
///
/// - records which sources were "spawned" and when each child "exited"
/// - sources marked with [`ScriptedLauncher::never_connects`] fail like a
///   child that never opened its side channel.
#[derive(Default)]
pub struct ScriptedLauncher {
    scripts: Mutex<HashMap<PathBuf, Script>>,
    fallback: Option<Script>,
    silent: Mutex<HashSet<PathBuf>>,
    journal: Arc<Mutex<Vec<LaunchEvent>>>,
    next_id: Mutex<u32>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script used for any source without its own.
    pub fn with_fallback(mut self, script: Script) -> Self {
        self.fallback = Some(script);
        self
    }

    pub fn with_script(self, source: impl Into<PathBuf>, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(source.into(), script);
        self
    }

    pub fn never_connects(self, source: impl Into<PathBuf>) -> Self {
        self.silent.lock().unwrap().insert(source.into());
        self
    }

    pub fn journal(&self) -> Vec<LaunchEvent> {
        self.journal.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                LaunchEvent::Spawned(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    fn script_for(&self, source: &Path) -> Option<Script> {
        self.scripts
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .or_else(|| self.fallback.clone())
    }

    fn record(&self, event: LaunchEvent) {
        self.journal.lock().unwrap().push(event);
    }
}

impl Launcher for ScriptedLauncher {
    fn launch<'a>(&'a self, source: &'a Path) -> BoxFuture<'a, Result<ChildSession, RunFailure>> {
        Box::pin(async move {
            self.record(LaunchEvent::Spawned(source.to_path_buf()));

            if self.silent.lock().unwrap().contains(source) {
                self.record(LaunchEvent::Exited(source.to_path_buf(), ChildExit::Terminated));
                return Err(RunFailure::TransportNeverEstablished(Duration::from_millis(50)));
            }

            let Some(script) = self.script_for(source) else {
                return Err(RunFailure::SpawnFailed(format!(
                    "no script for {}",
                    source.display()
                )));
            };

            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                *next
            };

            let (connection, end) = Connection::pair();
            let (exit_tx, exit_rx) = oneshot::channel();
            let task = tokio::spawn(async move {
                let code = script(end).await;
                let _ = exit_tx.send(code);
            });

            Ok(ChildSession {
                connection,
                child: Box::new(FakeChild {
                    id,
                    source: source.to_path_buf(),
                    task,
                    exit_rx,
                    exit: None,
                    journal: Arc::clone(&self.journal),
                }),
            })
        })
    }
}

/// Handle to a scripted child.
pub struct FakeChild {
    id: u32,
    source: PathBuf,
    task: JoinHandle<()>,
    exit_rx: oneshot::Receiver<i32>,
    exit: Option<ChildExit>,
    journal: Arc<Mutex<Vec<LaunchEvent>>>,
}

impl FakeChild {
    fn set_exit(&mut self, exit: ChildExit) -> ChildExit {
        if let Some(existing) = self.exit {
            return existing;
        }
        self.exit = Some(exit);
        self.journal
            .lock()
            .unwrap()
            .push(LaunchEvent::Exited(self.source.clone(), exit));
        exit
    }
}

impl ChildHandle for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(self.id)
    }

    fn try_exit(&mut self) -> Option<ChildExit> {
        if self.exit.is_none() {
            match self.exit_rx.try_recv() {
                Ok(code) => {
                    self.set_exit(ChildExit::from_code(Some(code)));
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.set_exit(ChildExit::Terminated);
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
        }
        self.exit
    }

    fn wait_for(&mut self, limit: Duration) -> BoxFuture<'_, Option<ChildExit>> {
        Box::pin(async move {
            if let Some(exit) = self.exit {
                return Some(exit);
            }
            match timeout(limit, &mut self.exit_rx).await {
                Ok(Ok(code)) => Some(self.set_exit(ChildExit::from_code(Some(code)))),
                Ok(Err(_)) => Some(self.set_exit(ChildExit::Terminated)),
                Err(_) => None,
            }
        })
    }

    fn terminate(&mut self) -> BoxFuture<'_, ChildExit> {
        Box::pin(async move {
            if let Some(exit) = self.try_exit() {
                return exit;
            }
            self.task.abort();
            let _ = (&mut self.task).await;
            self.set_exit(ChildExit::Terminated)
        })
    }
}
