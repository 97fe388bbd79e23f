// src/runner/directory.rs

//! Directory mode: every source below a directory, main cases only.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::RunFailure;
use crate::present::ProgressEvent;
use crate::runner::orchestrator::{CaseSelection, Orchestrator};
use crate::runner::outcome::DirectorySummary;
use crate::watch::collect_source_files;

impl Orchestrator {
    /// Run the main case of each source under `dir` in sorted path order.
    ///
    /// A failing file is tallied and the walk continues. A cancellation
    /// abandons the remaining files and suppresses the final summary.
    pub async fn run_directory(&self, dir: &Path, cancel: &CancellationToken) -> DirectorySummary {
        let mut summary = DirectorySummary::new(dir.to_path_buf());

        let files = match collect_source_files(self.fs.as_ref(), dir, &self.patterns) {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "could not list source files");
                self.present(ProgressEvent::Failure {
                    source: dir.to_path_buf(),
                    failure: RunFailure::InputUnavailable(format!("{err:#}")),
                });
                self.present(ProgressEvent::DirectoryFinished {
                    summary: summary.clone(),
                });
                return summary;
            }
        };
        info!(dir = %dir.display(), files = files.len(), "directory run");

        for file in files {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let outcome = self.run_file(&file, CaseSelection::MainOnly, cancel).await;
            if outcome.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let group = outcome.group.clone().unwrap_or_else(|| "other".to_string());
            let tally = summary.record(outcome);
            self.present(ProgressEvent::GroupProgress { group, tally });
        }

        if !summary.cancelled {
            self.present(ProgressEvent::DirectoryFinished {
                summary: summary.clone(),
            });
        }
        summary
    }
}
