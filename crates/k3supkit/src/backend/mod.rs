//! Process execution backends.
//!
//! The [`Executor`] trait is the seam between orchestration logic and the
//! operating system, allowing for different implementations:
//! - [`process::ProcessExecutor`] spawns the real k3sup binary
//! - [`MockExecutor`] replays scripted results for tests
//!
//! # Testing
//!
//! ```
//! use k3supkit::backend::{Executor, MockExecutor};
//! use k3supkit::CommandInvocation;
//!
//! let mock = MockExecutor::new().respond_exit(1);
//! let inv = CommandInvocation::new("/usr/local/bin/k3sup", vec!["install".to_string()]);
//!
//! assert_eq!(mock.run(&inv, false).unwrap().exit_code, 1);
//! assert_eq!(mock.call_count(), 1);
//! ```

pub mod process;

use crate::error::{Error, Result};
use crate::types::{CommandInvocation, ExecutionResult};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Runs command invocations and captures their output.
pub trait Executor: Send + Sync {
    /// Spawn the invocation and block until it exits.
    ///
    /// # Errors
    ///
    /// Returns `Error::Spawn` if the process cannot be started at all. A
    /// nonzero exit is not an error at this level.
    fn spawn(&self, invocation: &CommandInvocation) -> Result<ExecutionResult>;

    /// Run the invocation, or fabricate a `"check mode"` result when
    /// `dry_run` is set without spawning anything.
    fn run(&self, invocation: &CommandInvocation, dry_run: bool) -> Result<ExecutionResult> {
        if dry_run {
            log::info!("Check mode, not running: {}", invocation.render());
            return Ok(ExecutionResult::check_mode());
        }
        self.spawn(invocation)
    }
}

/// Get the default executor (real processes, no deadline).
pub fn default_executor() -> process::ProcessExecutor {
    process::ProcessExecutor::new()
}

#[derive(Debug, Clone)]
enum MockResponse {
    Result(ExecutionResult),
    SpawnError(io::ErrorKind),
}

/// Executor that replays scripted responses in order.
///
/// Every invocation it receives is recorded. Clones share both the script
/// and the call log, so a test can hand one clone to an orchestrator and
/// inspect the other. Once the script is exhausted it answers exit 0.
#[derive(Debug, Clone, Default)]
pub struct MockExecutor {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<Vec<CommandInvocation>>>,
}

impl MockExecutor {
    /// Create a mock with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a full result.
    #[must_use]
    pub fn respond(self, result: ExecutionResult) -> Self {
        lock(&self.responses).push_back(MockResponse::Result(result));
        self
    }

    /// Queue a result with the given exit code and empty output.
    #[must_use]
    pub fn respond_exit(self, exit_code: i32) -> Self {
        self.respond(ExecutionResult::new(exit_code, "", ""))
    }

    /// Queue a spawn failure.
    #[must_use]
    pub fn fail_spawn(self, kind: io::ErrorKind) -> Self {
        lock(&self.responses).push_back(MockResponse::SpawnError(kind));
        self
    }

    /// All invocations received so far.
    pub fn calls(&self) -> Vec<CommandInvocation> {
        lock(&self.calls).clone()
    }

    /// Number of invocations received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of received invocations that were probes.
    pub fn probe_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| is_probe(c)).count()
    }

    /// Number of received invocations that were install/join runs.
    pub fn mutating_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| !is_probe(c)).count()
    }
}

impl Executor for MockExecutor {
    fn spawn(&self, invocation: &CommandInvocation) -> Result<ExecutionResult> {
        lock(&self.calls).push(invocation.clone());

        match lock(&self.responses).pop_front() {
            Some(MockResponse::Result(result)) => Ok(result),
            Some(MockResponse::SpawnError(kind)) => Err(Error::Spawn {
                program: invocation.program().to_path_buf(),
                source: io::Error::from(kind),
            }),
            None => Ok(ExecutionResult::new(0, "", "")),
        }
    }
}

/// Probes put `--skip-install` directly after the verb.
fn is_probe(invocation: &CommandInvocation) -> bool {
    invocation
        .args()
        .get(1)
        .is_some_and(|arg| arg == "--skip-install")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
