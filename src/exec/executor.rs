// src/exec/executor.rs

//! Runs a single command with combined, bounded output capture.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::Stdio;
use std::thread;

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::ExecutionError;
use crate::exec::capture::{SharedCapture, TeeReader};
use crate::exec::sink::{OutputSink, TracingSink};
use crate::types::{CommandSpec, EnvironmentOverlay, WorkingDirectory};

/// Bytes of combined output kept for failure reports (10 MiB).
pub const CAPTURE_CAPACITY: usize = 10 * 1024 * 1024;

/// Command executor.
///
/// Both stdout and stderr of the child go to one pipe. A single drain task
/// tees that stream into a [`SharedCapture`] ring buffer and, line by line,
/// into the configured [`OutputSink`]. The sink sees lines while the child is
/// still running; the ring buffer is only read back to build the error.
pub struct Executor<S = TracingSink> {
    sink: S,
    capture_capacity: usize,
}

impl Executor<TracingSink> {
    pub fn new() -> Self {
        Self::with_sink(TracingSink::default())
    }
}

impl Default for Executor<TracingSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OutputSink> Executor<S> {
    pub fn with_sink(sink: S) -> Self {
        Self {
            sink,
            capture_capacity: CAPTURE_CAPACITY,
        }
    }

    /// Override the capture window. Mostly useful for tests.
    pub fn capture_capacity(mut self, capacity: usize) -> Self {
        self.capture_capacity = capacity;
        self
    }

    /// Run `command` to completion.
    ///
    /// Returns once the child has exited **and** its output has been drained
    /// to end-of-stream, or as soon as `cancel` fires, whichever comes first.
    /// Sending on the paired `oneshot::Sender` cancels; dropping it does not.
    ///
    /// Cancellation only abandons the wait. The child process is not killed
    /// and the drain task keeps running until the pipe closes.
    pub async fn execute(
        self,
        command: &CommandSpec,
        env: &EnvironmentOverlay,
        work_dir: &WorkingDirectory,
        cancel: oneshot::Receiver<()>,
    ) -> Result<(), ExecutionError> {
        let (reader, writer) = io::pipe().map_err(ExecutionError::PipeSetup)?;
        let stderr_writer = writer.try_clone().map_err(ExecutionError::PipeSetup)?;

        let capture = SharedCapture::new(self.capture_capacity);
        let mut drained = spawn_drain(reader, capture.clone(), self.sink)
            .map_err(ExecutionError::PipeSetup)?;

        let cancelled = async move {
            if cancel.await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(cancelled);

        info!(
            cmd = %command,
            work_dir = ?work_dir.as_path(),
            env_overrides = env.len(),
            "starting command"
        );

        let mut cmd = build_command(command, env, work_dir);
        cmd.stdout(writer).stderr(stderr_writer);
        let spawned = cmd.spawn();
        // `cmd` still holds the parent's copies of the write end; the drain
        // only sees end-of-stream once those are closed too.
        drop(cmd);

        let status = match spawned {
            Ok(mut child) => {
                debug!(cmd = %command, pid = ?child.id(), "command spawned");
                tokio::select! {
                    res = child.wait() => res,
                    () = &mut cancelled => {
                        warn!(
                            cmd = %command,
                            "cancellation requested; abandoning wait for running command"
                        );
                        return Err(ExecutionError::Cancelled {
                            captured_output: capture.snapshot_string(),
                        });
                    }
                }
            }
            Err(err) => Err(err),
        };

        tokio::select! {
            done = &mut drained => {
                if done.is_err() {
                    warn!(cmd = %command, "output drain thread stopped without finishing");
                }
            }
            () = &mut cancelled => {
                warn!(
                    cmd = %command,
                    "cancellation requested; no longer waiting for output to drain"
                );
            }
        }

        match status {
            Ok(status) if status.success() => {
                info!(cmd = %command, "command finished");
                Ok(())
            }
            Ok(status) => {
                let captured_output = capture.snapshot_string();
                warn!(
                    cmd = %command,
                    exit_code = ?status.code(),
                    captured_bytes = capture.total_written(),
                    "command failed"
                );
                Err(ExecutionError::CommandFailed {
                    exit_detail: status.to_string(),
                    captured_output,
                })
            }
            Err(err) => {
                warn!(cmd = %command, error = %err, "command could not be run");
                Err(ExecutionError::CommandFailed {
                    exit_detail: format!("failed to run `{}`: {err}", command.program()),
                    captured_output: capture.snapshot_string(),
                })
            }
        }
    }
}

/// Run `command` with the default tracing sink and capture window.
pub async fn execute(
    command: &CommandSpec,
    env: &EnvironmentOverlay,
    work_dir: &WorkingDirectory,
    cancel: oneshot::Receiver<()>,
) -> Result<(), ExecutionError> {
    Executor::new().execute(command, env, work_dir, cancel).await
}

fn build_command(
    command: &CommandSpec,
    env: &EnvironmentOverlay,
    work_dir: &WorkingDirectory,
) -> Command {
    let mut cmd = Command::new(command.program());
    cmd.args(command.args())
        .envs(env.iter())
        .stdin(Stdio::null())
        .kill_on_drop(false);

    if !work_dir.is_inherited() {
        cmd.current_dir(work_dir.as_path());
    }
    cmd
}

/// Drain the read end of the output pipe on a dedicated thread.
///
/// Every byte is captured before the line it belongs to reaches the sink.
/// The returned receiver resolves once end-of-stream was observed. The thread
/// is detached: an abandoned drain never holds up runtime or process exit.
fn spawn_drain<S: OutputSink>(
    reader: PipeReader,
    capture: SharedCapture,
    mut sink: S,
) -> io::Result<oneshot::Receiver<()>> {
    let (done_tx, done_rx) = oneshot::channel();
    thread::Builder::new()
        .name("localrun-drain".to_string())
        .spawn(move || {
            let mut lines = BufReader::new(TeeReader::new(reader, capture));
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match lines.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => sink.emit_line(&decode_line(&buf)),
                    Err(err) => {
                        if !buf.is_empty() {
                            sink.emit_line(&decode_line(&buf));
                        }
                        warn!(error = %err, "reading command output failed");
                        break;
                    }
                }
            }
            debug!("command output drained");
            let _ = done_tx.send(());
        })?;
    Ok(done_rx)
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
