//! Core types for k3sup orchestration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Role of the node being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Control-plane node, installed with `k3sup install`
    Server,
    /// Worker node, joined with `k3sup join`
    Agent,
}

impl Action {
    /// k3sup sub-command for this role.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Server => "install",
            Action::Agent => "join",
        }
    }

    /// Role name as accepted in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Server => "server",
            Action::Agent => "agent",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Action::Server),
            "agent" => Ok(Action::Agent),
            other => Err(Error::validation(format!(
                "action must be one of server, agent (got '{other}')"
            ))),
        }
    }
}

/// Options that only mean something when joining a node to an existing server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinOptions {
    /// Join as an additional server instead of an agent
    pub server: bool,
    /// Public IP of the existing k3s server
    pub server_ip: Option<String>,
    /// SSH port of the existing server
    pub server_ssh_port: Option<u16>,
    /// SSH user of the existing server
    pub server_user: Option<String>,
    /// Start in clustering mode (embedded HA)
    pub cluster: bool,
    /// Datastore connection string for external HA
    pub datastore: Option<String>,
}

impl JoinOptions {
    /// True when none of the join options are set.
    pub fn is_empty(&self) -> bool {
        !self.server
            && !self.cluster
            && self.server_ip.is_none()
            && self.server_ssh_port.is_none()
            && self.server_user.is_none()
            && self.datastore.is_none()
    }
}

/// Validated configuration for one node.
///
/// Built by [`crate::RawConfig::normalize`]; every field already carries its
/// default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Role of the node
    pub action: Action,
    /// Path to the k3sup binary
    pub installer: PathBuf,
    /// Public IP of the target node
    pub ip: String,
    /// SSH user on the target
    pub user: String,
    /// SSH private key used for login
    pub ssh_key: String,
    /// SSH port on the target
    pub ssh_port: u16,
    /// Where the kubeconfig is written locally
    pub local_path: String,
    /// Perform a local install without SSH
    pub local: bool,
    /// Merge into an existing kubeconfig instead of overwriting
    pub merge: bool,
    /// Kubeconfig context name (install only)
    pub context: String,
    /// Use sudo on the target
    pub sudo: bool,
    /// Only fetch the kubeconfig of an already installed node
    pub skip_install: bool,
    /// Disable servicelb and traefik
    pub no_extras: bool,
    /// Role-scoped options for joining
    pub join: JoinOptions,
    /// Extra arguments handed to the k3s installer, passed as one value
    pub k3s_extra_args: Option<String>,
    /// Pinned k3s version
    pub k3s_version: Option<String>,
    /// Use the ipsec flannel backend
    pub ipsec: bool,
}

/// Whether a command probes the target or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Non-mutating state check (`--skip-install`)
    Probe,
    /// The real install/join
    Execute,
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationMode::Probe => write!(f, "probe"),
            OperationMode::Execute => write!(f, "execute"),
        }
    }
}

/// A concrete program invocation: binary plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInvocation {
    /// Create an invocation from a program and its arguments.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The program to run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument vector, never passed through a shell.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether a bare flag appears in the argument list.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    /// Space-joined form for display and audit only.
    pub fn render(&self) -> String {
        let mut rendered = self.program.display().to_string();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Captured result of one installer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Exit code; `-1` when the process was terminated by a signal
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecutionResult {
    /// Create a result from its parts.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Synthetic result reported instead of running anything.
    pub fn check_mode() -> Self {
        Self::new(0, "check mode", "")
    }

    /// Whether the run exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Classified outcome of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Exit code 1: the node is not installed/joined yet
    Absent,
    /// Exit code 0: the node is already in place
    Present,
    /// Any other exit code, treated as already in place
    Ambiguous(i32),
}

impl ProbeStatus {
    /// Classify a probe exit code. Only `1` means absent.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            1 => ProbeStatus::Absent,
            0 => ProbeStatus::Present,
            other => ProbeStatus::Ambiguous(other),
        }
    }

    /// Whether the desired state counts as already reached.
    pub fn is_satisfied(&self) -> bool {
        !matches!(self, ProbeStatus::Absent)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Absent => write!(f, "absent"),
            ProbeStatus::Present => write!(f, "present"),
            ProbeStatus::Ambiguous(code) => write!(f, "ambiguous (exit code {code})"),
        }
    }
}

/// Options for one converge run.
///
/// # Example
///
/// ```
/// use k3supkit::RunOptions;
///
/// let options = RunOptions::new().dry_run(true).probe_in_dry_run(true);
/// assert!(options.dry_run);
/// assert!(options.probe_in_dry_run);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Plan only: never run the mutating command
    pub dry_run: bool,
    /// Still run the non-mutating probe during a dry run
    pub probe_in_dry_run: bool,
}

impl RunOptions {
    /// Create run options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set plan-only mode.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set whether a dry run still probes the target.
    #[must_use]
    pub fn probe_in_dry_run(mut self, probe: bool) -> Self {
        self.probe_in_dry_run = probe;
        self
    }
}

/// Result reported to the caller after a converge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Whether the install/join ran (or would run, in a dry run)
    pub changed: bool,
    /// Rendered install/join command; absent when the run was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Role name
    pub action: Action,
    /// Target host
    pub ip: String,
    /// Captured standard output of the install/join
    pub stdout: String,
    /// Captured standard error of the install/join
    pub stderr: String,
    /// Whether this outcome describes a plan rather than a real run
    #[serde(default)]
    pub dry_run: bool,
}

impl OperationOutcome {
    /// Outcome for a target that already has the desired state.
    pub fn unchanged(config: &Configuration) -> Self {
        Self {
            changed: false,
            cmd: None,
            action: config.action,
            ip: config.ip.clone(),
            stdout: String::new(),
            stderr: String::new(),
            dry_run: false,
        }
    }

    /// Outcome for an install/join that ran (or was planned).
    pub fn changed(
        config: &Configuration,
        invocation: &CommandInvocation,
        result: ExecutionResult,
    ) -> Self {
        Self {
            changed: true,
            cmd: Some(invocation.render()),
            action: config.action,
            ip: config.ip.clone(),
            stdout: result.stdout,
            stderr: result.stderr,
            dry_run: false,
        }
    }

    /// Mark this outcome as a plan.
    #[must_use]
    pub fn planned(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
