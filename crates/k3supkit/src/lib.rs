//! # k3supkit
//!
//! Idempotent orchestration of [k3sup](https://github.com/alexellis/k3sup)
//! server installs and agent joins.
//!
//! This crate provides functionality for:
//! - Normalizing a flat parameter record into a validated [`Configuration`]
//! - Building reproducible k3sup command lines, with a non-mutating probe form
//! - Probing a target so install/join only runs when the node is not set up
//! - Dry runs that describe the command without spawning anything
//!
//! ## Example
//!
//! ```no_run
//! use k3supkit::{Orchestrator, RawConfig, RunOptions};
//!
//! let config = RawConfig::from_pairs([("action", "server"), ("ip", "10.0.0.5")])
//!     .and_then(|raw| raw.normalize())
//!     .expect("invalid configuration");
//!
//! let outcome = Orchestrator::default()
//!     .converge(&config, &RunOptions::new())
//!     .expect("converge failed");
//!
//! if outcome.changed {
//!     println!("ran: {}", outcome.cmd.unwrap_or_default());
//! }
//! ```
//!
//! ## Probe semantics
//!
//! | Probe exit code | Meaning                     | Install/join runs |
//! |-----------------|-----------------------------|-------------------|
//! | 1               | Node not set up             | yes               |
//! | 0               | Node already set up         | no                |
//! | anything else   | Ambiguous, logged as warning| no                |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod installer;
pub mod orchestrator;
pub mod probe;
pub mod types;

pub use backend::Executor;
pub use backend::process::ProcessExecutor;
pub use config::RawConfig;
pub use error::{Error, ErrorCategory, Result};
pub use orchestrator::Orchestrator;
pub use probe::Prober;
pub use types::{
    Action, CommandInvocation, Configuration, ExecutionResult, JoinOptions, OperationMode,
    OperationOutcome, ProbeStatus, RunOptions,
};
