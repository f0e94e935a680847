use std::io;
use std::pin::pin;
use std::process::Stdio;
use std::time::Duration;

use compio::BufResult;
use compio::io::{AsyncRead, AsyncReadExt};
use compio::process::{Child, Command};
use futures::future::{self, Either};
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use super::{RetryPolicy, retry};

/// Runs command lines through `sh -c`.
///
/// Output is only kept for failed commands; a successful run reports nothing
/// back. Each invocation is bounded by the optional timeout, and a shell that
/// overruns it is killed and reaped before the call returns.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Runs `command_line` once.
    ///
    /// On a non-zero exit the error carries stdout followed by stderr.
    pub async fn run(&self, command_line: &str) -> Result<(), CommandError> {
        debug!("Running command: {}", command_line);
        let mut child = Self::create_command(command_line)
            .spawn()
            .context(SpawnSnafu {
                command: command_line,
            })?;

        let collect = pin!(future::join(
            read_pipe(child.stdout.take()),
            read_pipe(child.stderr.take()),
        ));
        let (stdout, stderr) = match self.timeout {
            Some(limit) => {
                let deadline = pin!(compio::time::sleep(limit));
                match future::select(collect, deadline).await {
                    Either::Left((output, _)) => output,
                    Either::Right(_) => {
                        Self::terminate(child, command_line).await;
                        return TimedOutSnafu {
                            command: command_line,
                            timeout_ms: limit.as_millis() as u64,
                        }
                        .fail();
                    }
                }
            }
            None => collect.await,
        };
        let context = WaitSnafu {
            command: command_line,
        };
        let stdout = stdout.context(context)?;
        let stderr = stderr.context(context)?;
        let status = child.wait().await.context(context)?;

        if status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&stderr));
        FailedSnafu {
            command: command_line,
            status: status.code().unwrap_or(-1),
            output: combined,
        }
        .fail()
    }

    /// Runs `command_line` until it succeeds, at most `policy.attempts()` times.
    pub async fn run_with_retry(
        &self,
        command_line: &str,
        policy: RetryPolicy,
    ) -> Result<(), CommandError> {
        retry(policy, move |_| self.run(command_line)).await
    }

    async fn terminate(mut child: Child, command_line: &str) {
        warn!("Killing timed out command: {}", command_line);
        if let Err(err) = child.kill() {
            warn!("Failed to kill '{}': {}", command_line, err);
        }
        if let Err(err) = child.wait().await {
            warn!("Failed to reap '{}': {}", command_line, err);
        }
    }

    fn create_command(command_line: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        let _ = cmd.stdin(Stdio::null());
        let _ = cmd.stdout(Stdio::piped());
        let _ = cmd.stderr(Stdio::piped());
        cmd
    }
}

async fn read_pipe<R: AsyncRead>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let Some(mut pipe) = pipe else {
        return Ok(Vec::new());
    };
    let BufResult(result, buf) = pipe.read_to_end(Vec::new()).await;
    result.map(|_| buf)
}

#[derive(Debug, Snafu)]
pub enum CommandError {
    #[snafu(display("Failed to spawn command '{}'", command))]
    SpawnError {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to wait for command '{}'", command))]
    WaitError {
        command: String,
        source: std::io::Error,
    },
    #[snafu(display("Command '{}' timed out after {} ms", command, timeout_ms))]
    TimedOut { command: String, timeout_ms: u64 },
    #[snafu(display(
        "Command '{}' failed with exit code {}: {}",
        command,
        status,
        output.trim_end()
    ))]
    Failed {
        command: String,
        status: i32,
        output: String,
    },
}

impl CommandError {
    /// Captured output of a command that ran and failed, empty otherwise.
    pub fn output(&self) -> &str {
        match self {
            CommandError::Failed { output, .. } => output,
            _ => "",
        }
    }
}
