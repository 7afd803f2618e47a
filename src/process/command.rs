//! Supervised subprocess execution.
//!
//! Captured runs drain stdout and stderr concurrently into in-memory
//! buffers (optionally tee-ing to the parent's streams) and relay an
//! interrupt to the child instead of dying under it. The reader tasks are
//! joined before the captured text is returned.

use std::io::Write;
use std::process::{ExitStatus, Stdio};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SortieError};

#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
    pub interrupted: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Convert a failed run into an error: `Interrupted` when the child
    /// died because we relayed a cancellation, `Subprocess` otherwise.
    pub fn ensure_success(&self, command: &str) -> Result<()> {
        if self.interrupted {
            return Err(SortieError::Interrupted);
        }

        if !self.status.success() {
            let stderr = self.stderr.trim();
            let detail = if stderr.is_empty() {
                self.status.to_string()
            } else {
                format!("{}: {}", self.status, stderr)
            };

            return Err(SortieError::Subprocess {
                command: command.to_string(),
                detail,
            });
        }

        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Tee {
    Stdout,
    Stderr,
}

impl Tee {
    fn write(self, chunk: &[u8]) {
        match self {
            Tee::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(chunk);
                let _ = out.flush();
            }
            Tee::Stderr => {
                let mut err = std::io::stderr().lock();
                let _ = err.write_all(chunk);
                let _ = err.flush();
            }
        }
    }
}

/// Run a command to completion, capturing both output streams.
///
/// With `silent = false` the captured chunks are also tee'd to the
/// parent's stdout/stderr as they arrive. A cancellation of `cancel`
/// relays SIGINT to the child and keeps waiting for it to exit; the
/// result is then marked `interrupted`.
pub async fn run_captured(
    argv: &[String],
    silent: bool,
    cancel: &CancellationToken,
) -> Result<CommandOutput> {
    run_captured_in(argv, None, silent, cancel).await
}

/// Like [`run_captured`], with the child's working directory pinned to
/// `dir`. The parent process never changes its own working directory.
pub async fn run_captured_in(
    argv: &[String],
    dir: Option<&std::path::Path>,
    silent: bool,
    cancel: &CancellationToken,
) -> Result<CommandOutput> {
    let (program, args) = split_argv(argv)?;
    debug!(command = %argv.join(" "), dir = ?dir, "running command");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| SortieError::Subprocess {
        command: program.to_string(),
        detail: e.to_string(),
    })?;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");
    let out_tee = (!silent).then_some(Tee::Stdout);
    let err_tee = (!silent).then_some(Tee::Stderr);
    let out_task = tokio::spawn(drain(stdout, out_tee));
    let err_task = tokio::spawn(drain(stderr, err_tee));

    let mut interrupted = false;
    let status = loop {
        tokio::select! {
            _ = cancel.cancelled(), if !interrupted => {
                interrupted = true;
                interrupt_child(&child);
            }
            status = child.wait() => break status?,
        }
    };

    // Join barrier: the captured text is complete before it is returned.
    let stdout = out_task.await.unwrap_or_default();
    let stderr = err_task.await.unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        status,
        interrupted,
    })
}

/// Run a command wired to the parent's terminal.
///
/// The caller's interrupt listener keeps the parent alive; the child
/// receives Ctrl-C from the terminal directly, so nothing is relayed
/// here.
pub async fn run_interactive(argv: &[String]) -> Result<ExitStatus> {
    let (program, args) = split_argv(argv)?;
    debug!(command = %argv.join(" "), "running interactive command");

    let mut child = Command::new(program)
        .args(args)
        .spawn()
        .map_err(|e| SortieError::Subprocess {
            command: program.to_string(),
            detail: e.to_string(),
        })?;

    Ok(child.wait().await?)
}

fn split_argv(argv: &[String]) -> Result<(&String, &[String])> {
    argv.split_first()
        .ok_or_else(|| SortieError::Other("empty command line".to_string()))
}

async fn drain(mut reader: impl AsyncReadExt + Unpin, tee: Option<Tee>) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(tee) = tee {
                    tee.write(&chunk[..n]);
                }
            }
        }
    }

    buf
}

#[cfg(unix)]
fn interrupt_child(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
    }
}

#[cfg(not(unix))]
fn interrupt_child(_child: &Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let cancel = CancellationToken::new();
        let out = run_captured(
            &argv(&["sh", "-c", "echo out; echo err 1>&2"]),
            true,
            &cancel,
        )
        .await
        .unwrap();

        assert!(out.success());
        assert!(!out.interrupted);
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[tokio::test]
    async fn non_zero_exit_becomes_subprocess_error() {
        let cancel = CancellationToken::new();
        let out = run_captured(&argv(&["sh", "-c", "echo boom 1>&2; exit 3"]), true, &cancel)
            .await
            .unwrap();

        assert!(!out.success());
        let err = out.ensure_success("sh").unwrap_err();
        assert!(matches!(err, SortieError::Subprocess { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_child() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let out = run_captured(&argv(&["sleep", "30"]), true, &cancel).await.unwrap();

        assert!(out.interrupted);
        assert!(matches!(
            out.ensure_success("sleep").unwrap_err(),
            SortieError::Interrupted
        ));
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure() {
        let cancel = CancellationToken::new();
        let err = run_captured(&argv(&["definitely-not-a-binary-xyz"]), true, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SortieError::Subprocess { .. }));
    }
}
