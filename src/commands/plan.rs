//! `k3node plan`: dry-run converge.

use crate::Context;
use crate::cli::PlanArgs;
use crate::commands::{executor, print_outcome};
use crate::config;
use crate::progress;
use anyhow::Result;
use k3supkit::{Orchestrator, RunOptions};

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let config = config::resolve(ctx.config.as_deref(), &args.node)?;
    let orchestrator = Orchestrator::new(Box::new(executor(None)));
    let options = RunOptions::new().dry_run(true).probe_in_dry_run(args.probe);

    // Without --probe nothing is spawned, so there is nothing to wait for
    let outcome = progress::with_spinner(
        &format!("Probing {} node at {}", config.action, config.ip),
        args.probe && ctx.show_progress(),
        || orchestrator.converge(&config, &options),
    )?;

    print_outcome(ctx, &outcome)
}
