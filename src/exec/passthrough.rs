// src/exec/passthrough.rs

//! Forwarding of a child's stdout/stderr to the presenter.
//!
//! Output is free-form: lines are split on `\n` and decoded lossily, so a
//! stray non-UTF-8 byte never stops the pipe from being drained.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::present::{Presenter, ProgressEvent};

/// Spawn one task that merges stdout and stderr line by line into
/// `ProgressEvent::Output`. The task ends once both streams hit EOF.
pub fn spawn_passthrough(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    presenter: Arc<dyn Presenter>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut out = stdout.map(BufReader::new);
        let mut err = stderr.map(BufReader::new);
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_open = out.is_some();
        let mut err_open = err.is_some();

        loop {
            tokio::select! {
                line = next_line(&mut out, &mut out_buf), if out_open => match line {
                    Some(line) => presenter.present(ProgressEvent::Output { line }),
                    None => out_open = false,
                },
                line = next_line(&mut err, &mut err_buf), if err_open => match line {
                    Some(line) => presenter.present(ProgressEvent::Output { line }),
                    None => err_open = false,
                },
                else => break,
            }
        }

        debug!("child output passthrough finished");
    })
}

/// Next line without its terminator, or `None` at EOF.
///
/// `read_until` keeps partial bytes in `buf` when the other select branch
/// wins, so `buf` is only cleared once a line has been handed out.
async fn next_line<R>(reader: &mut Option<BufReader<R>>, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let reader = reader.as_mut()?;
    match reader.read_until(b'\n', buf).await {
        Ok(0) if buf.is_empty() => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            let line = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            Some(line)
        }
        Err(err) => {
            debug!(error = %err, "child output stream failed");
            None
        }
    }
}
