//! Subcommand implementations.

pub mod apply;
pub mod plan;
pub mod probe;
pub mod render;

use crate::Context;
use crate::ui;
use anyhow::Result;
use k3supkit::{Action, OperationOutcome, ProcessExecutor};
use std::time::Duration;

/// Executor for real runs, with an optional per-run deadline in seconds.
pub(crate) fn executor(timeout: Option<u64>) -> ProcessExecutor {
    match timeout {
        Some(secs) => ProcessExecutor::with_timeout(Duration::from_secs(secs)),
        None => ProcessExecutor::new(),
    }
}

/// Past-tense description of a completed run.
fn done_verb(action: Action) -> &'static str {
    match action {
        Action::Server => "Installed",
        Action::Agent => "Joined",
    }
}

/// Print a converge outcome as JSON or for humans.
pub(crate) fn print_outcome(ctx: &Context, outcome: &OperationOutcome) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }

    let node = format!("{} node at {}", outcome.action, outcome.ip);
    match (outcome.changed, outcome.dry_run) {
        (true, true) => ui::info(&format!("Would {} {node}", outcome.action.verb())),
        (true, false) => ui::success(&format!("{} {node}", done_verb(outcome.action))),
        (false, _) => ui::success(&format!("{node} is already set up, nothing to do")),
    }

    if let Some(cmd) = &outcome.cmd {
        ui::kv("command", cmd);
    }
    if ctx.verbose > 0 && !outcome.dry_run {
        ui::output_block("stdout", &outcome.stdout);
        ui::output_block("stderr", &outcome.stderr);
    }
    Ok(())
}
