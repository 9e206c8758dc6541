//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` spawns the program directly (never through a shell),
//! reads its output concurrently with waiting on it, and kills it when the
//! timeout fires.

use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use crate::application::ports::CommandRunner;
use crate::domain::CommandError;

/// Default timeout for `qm` commands.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for `qm importdisk`, which copies the whole image.
pub const IMPORT_TIMEOUT: Duration = Duration::from_secs(600);

/// Joins a program and its arguments for messages and logs.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Production `CommandRunner` backed by `tokio::process`.
///
/// `tokio::time::timeout` around `.output()` would only drop the future and
/// leave the process running, so the timeout branch kills the child
/// explicitly.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let line = command_line(program, args);
        tracing::info!("Running: {line}");

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let output = tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                anyhow::Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result?,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                tracing::warn!(command = %line, timeout_secs = timeout.as_secs(), "command timed out");
                return Err(CommandError::timed_out(line, timeout.as_secs()).into());
            }
        };

        tracing::debug!(command = %line, code = ?output.status.code(), "command finished");
        Ok(output)
    }
}
