//! `k3node probe`: report whether the node is already set up.

use crate::Context;
use crate::cli::ProbeArgs;
use crate::commands::executor;
use crate::config;
use crate::progress;
use crate::ui;
use anyhow::Result;
use k3supkit::{Action, Orchestrator, ProbeStatus};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ProbeReport<'a> {
    action: Action,
    ip: &'a str,
    status: ProbeStatus,
    satisfied: bool,
}

pub fn run(ctx: &Context, args: ProbeArgs) -> Result<()> {
    let config = config::resolve(ctx.config.as_deref(), &args.node)?;
    let orchestrator = Orchestrator::new(Box::new(executor(args.timeout)));

    let status = progress::with_spinner(
        &format!("Probing {} node at {}", config.action, config.ip),
        ctx.show_progress(),
        || orchestrator.probe(&config),
    )?;

    if ctx.json {
        let report = ProbeReport {
            action: config.action,
            ip: &config.ip,
            status,
            satisfied: status.is_satisfied(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let node = format!("{} node at {}", config.action, config.ip);
    match status {
        ProbeStatus::Present => ui::success(&format!("{node} is set up")),
        ProbeStatus::Absent => ui::info(&format!("{node} is not set up yet")),
        ProbeStatus::Ambiguous(_) => {
            ui::warn(&format!("{node}: probe was {status}, treating as set up"));
        }
    }
    Ok(())
}
