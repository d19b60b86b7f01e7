//! Real process backend that spawns the k3sup binary.

use crate::backend::Executor;
use crate::error::{Error, Result};
use crate::types::{CommandInvocation, ExecutionResult};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Executor that spawns real processes.
///
/// Arguments are handed to the OS as a vector; nothing goes through a shell.
/// Without a timeout, a hung SSH session blocks the caller indefinitely.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    /// Create an executor without a deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill runs that take longer than `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// The configured deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn command(invocation: &CommandInvocation) -> Command {
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn spawn_error(invocation: &CommandInvocation, source: io::Error) -> Error {
        Error::Spawn {
            program: invocation.program().to_path_buf(),
            source,
        }
    }

    fn run_to_completion(invocation: &CommandInvocation) -> Result<ExecutionResult> {
        let output = Self::command(invocation)
            .output()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        Ok(ExecutionResult {
            exit_code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_with_deadline(
        invocation: &CommandInvocation,
        timeout: Duration,
    ) -> Result<ExecutionResult> {
        let deadline = Instant::now() + timeout;
        let mut child = Self::command(invocation)
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        // Drain both pipes concurrently so a chatty child cannot fill one
        // and stall before it exits.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                log::warn!(
                    "{} exceeded {}s, terminating",
                    invocation.program().display(),
                    timeout.as_secs()
                );
                terminate(&mut child);
                return Err(Self::cancelled(invocation, timeout));
            }
            Err(e) => {
                terminate(&mut child);
                return Err(e.into());
            }
        };

        // The child is gone, but anything it left running in the background
        // can still hold the pipes open.
        let (Some(stdout), Some(stderr)) = (collect(stdout, deadline)?, collect(stderr, deadline)?)
        else {
            log::warn!(
                "{} exited but its output stayed open past {}s",
                invocation.program().display(),
                timeout.as_secs()
            );
            return Err(Self::cancelled(invocation, timeout));
        };

        Ok(ExecutionResult {
            exit_code: exit_code(status),
            stdout,
            stderr,
        })
    }

    fn cancelled(invocation: &CommandInvocation, timeout: Duration) -> Error {
        Error::Cancelled {
            program: invocation.program().to_path_buf(),
            timeout,
        }
    }
}

impl Executor for ProcessExecutor {
    fn spawn(&self, invocation: &CommandInvocation) -> Result<ExecutionResult> {
        log::debug!("Running: {}", invocation.render());

        let result = match self.timeout {
            Some(timeout) => Self::run_with_deadline(invocation, timeout)?,
            None => Self::run_to_completion(invocation)?,
        };

        log::debug!(
            "{} exited with code {}",
            invocation.program().display(),
            result.exit_code
        );
        Ok(result)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    // None means the child was terminated by a signal
    status.code().unwrap_or(-1)
}

/// Kill and reap a child that is being abandoned.
fn terminate(child: &mut Child) {
    // The child may already have exited on its own.
    if let Err(e) = child.kill() {
        log::debug!("kill failed: {}", e);
    }
    if let Err(e) = child.wait() {
        log::debug!("reaping child failed: {}", e);
    }
}

type Reader = Receiver<io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Reader {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf).map(|_| buf);
        // The receiver is gone once the deadline has passed
        let _ = tx.send(result);
    });
    rx
}

/// Wait for a reader until `deadline`. `None` means the pipe is still open.
fn collect(reader: Option<Reader>, deadline: Instant) -> Result<Option<String>> {
    let Some(rx) = reader else {
        return Ok(Some(String::new()));
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes?).into_owned())),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => {
            Err(io::Error::other("output reader thread panicked").into())
        }
    }
}
