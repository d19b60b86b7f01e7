//! Converge a node to its desired role.

use crate::backend::{self, Executor};
use crate::command;
use crate::error::{Error, Result};
use crate::installer;
use crate::probe::Prober;
use crate::types::{
    CommandInvocation, Configuration, OperationMode, OperationOutcome, ProbeStatus, RunOptions,
};

/// Drives validate, probe, then install or join for one node.
///
/// The orchestrator holds nothing but its executor, so one instance can be
/// reused across any number of configurations.
pub struct Orchestrator {
    executor: Box<dyn Executor>,
}

impl Orchestrator {
    /// Create an orchestrator with a custom executor.
    pub fn new(executor: Box<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Build the command for `config` without running anything.
    pub fn plan(&self, config: &Configuration, mode: OperationMode) -> CommandInvocation {
        command::build(config, mode)
    }

    /// Validate the installer and probe the target.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the installer is unusable, or an
    /// execution error if the probe cannot be spawned.
    pub fn probe(&self, config: &Configuration) -> Result<ProbeStatus> {
        self.validate(config)?;
        Prober::new(self.executor.as_ref()).probe(config)
    }

    /// Bring the target into the configured role.
    ///
    /// Runs the install/join only when the probe says the node is not set up
    /// yet. With `options.dry_run` the mutating command is never spawned and
    /// the outcome describes what would run.
    ///
    /// # Errors
    ///
    /// - Validation errors when the installer is missing or not executable
    /// - `Error::Spawn` when the probe or the install/join cannot start
    /// - `Error::RemoteFailure` when the install/join exits nonzero
    pub fn converge(
        &self,
        config: &Configuration,
        options: &RunOptions,
    ) -> Result<OperationOutcome> {
        self.validate(config)?;

        let satisfied = if options.dry_run && !options.probe_in_dry_run {
            log::debug!("Dry run, not probing {}", config.ip);
            false
        } else {
            log::debug!("Probing {} node at {}", config.action, config.ip);
            Prober::new(self.executor.as_ref()).is_satisfied(config)?
        };

        if satisfied {
            log::debug!("{} node at {} already configured, skipping", config.action, config.ip);
            let outcome = OperationOutcome::unchanged(config).planned(options.dry_run);
            log::info!("{} node at {}: unchanged", config.action, config.ip);
            return Ok(outcome);
        }

        let invocation = command::build(config, OperationMode::Execute);
        log::debug!("Executing: {}", invocation.render());

        let result = self.executor.run(&invocation, options.dry_run)?;
        if !result.success() {
            return Err(Error::RemoteFailure {
                action: config.action,
                verb: config.action.verb(),
                ip: config.ip.clone(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        let outcome = OperationOutcome::changed(config, &invocation, result).planned(options.dry_run);
        if options.dry_run {
            log::info!("{} node at {}: would {}", config.action, config.ip, config.action.verb());
        } else {
            log::info!("{} node at {}: changed", config.action, config.ip);
        }
        Ok(outcome)
    }

    fn validate(&self, config: &Configuration) -> Result<()> {
        log::debug!("Validating installer {}", config.installer.display());
        let resolved = installer::ensure_executable(&config.installer)?;
        log::debug!("Using installer {}", resolved.display());
        Ok(())
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(Box::new(backend::default_executor()))
    }
}
