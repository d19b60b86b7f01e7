//! Idempotency probe.
//!
//! k3sup has no status command. Instead the probe runs the same verb with
//! `--skip-install` and only the addressing flags, and reads the exit code:
//! 1 means the node is not set up yet. Every other code counts as set up.

use crate::backend::Executor;
use crate::command;
use crate::error::Result;
use crate::types::{Configuration, OperationMode, ProbeStatus};

/// Decides whether a target already has the desired state.
pub struct Prober<'a> {
    executor: &'a dyn Executor,
}

impl<'a> Prober<'a> {
    /// Create a prober that runs through `executor`.
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    /// Run the probe command and classify its exit code.
    ///
    /// The probe always spawns, regardless of any dry-run setting.
    ///
    /// # Errors
    ///
    /// Propagates spawn failures from the executor.
    pub fn probe(&self, config: &Configuration) -> Result<ProbeStatus> {
        let invocation = command::build(config, OperationMode::Probe);
        let result = self.executor.run(&invocation, false)?;
        let status = ProbeStatus::from_exit_code(result.exit_code);

        if let ProbeStatus::Ambiguous(code) = status {
            log::warn!(
                "Probe of {} node at {} exited with unexpected code {}, assuming already configured",
                config.action,
                config.ip,
                code
            );
            if !result.stderr.trim().is_empty() {
                log::warn!("Probe stderr: {}", result.stderr.trim());
            }
        }

        log::debug!("Probe of {} at {}: {}", config.action, config.ip, status);
        Ok(status)
    }

    /// Whether the target is already configured.
    pub fn is_satisfied(&self, config: &Configuration) -> Result<bool> {
        Ok(self.probe(config)?.is_satisfied())
    }
}
