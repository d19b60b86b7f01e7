//! `k3node apply`: converge the node.

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands::{executor, print_outcome};
use crate::config;
use crate::progress;
use crate::ui;
use anyhow::Result;
use k3supkit::{Orchestrator, RunOptions};

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let config = config::resolve(ctx.config.as_deref(), &args.node)?;
    let orchestrator = Orchestrator::new(Box::new(executor(args.timeout)));
    let options = RunOptions::new().dry_run(args.dry_run);

    if args.dry_run && !ctx.quiet && !ctx.json {
        ui::warn("Dry run: k3sup will not be executed");
    }

    let message = format!("Converging {} node at {}", config.action, config.ip);
    let outcome = progress::with_spinner(&message, ctx.show_progress(), || {
        orchestrator.converge(&config, &options)
    })?;

    print_outcome(ctx, &outcome)
}
