//! `k3node render`: print the k3sup command line.

use crate::Context;
use crate::cli::RenderArgs;
use crate::config;
use anyhow::Result;
use k3supkit::{CommandInvocation, OperationMode, command};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RenderedCommand<'a> {
    mode: OperationMode,
    program: String,
    args: &'a [String],
    cmd: String,
}

impl<'a> RenderedCommand<'a> {
    fn new(mode: OperationMode, invocation: &'a CommandInvocation) -> Self {
        Self {
            mode,
            program: invocation.program().display().to_string(),
            args: invocation.args(),
            cmd: invocation.render(),
        }
    }
}

pub fn run(ctx: &Context, args: RenderArgs) -> Result<()> {
    let config = config::resolve(ctx.config.as_deref(), &args.node)?;
    let mode = OperationMode::from(args.mode);
    let invocation = command::build(&config, mode);

    if ctx.json {
        let rendered = RenderedCommand::new(mode, &invocation);
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        println!("{}", invocation.render());
    }
    Ok(())
}
