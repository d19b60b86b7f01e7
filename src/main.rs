mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub config: Option<PathBuf>,
}

impl Context {
    /// Whether spinners should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json && io::stderr().is_terminal()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        config: cli.config,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&ctx, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Apply(args) => commands::apply::run(ctx, args),
        Command::Plan(args) => commands::plan::run(ctx, args),
        Command::Probe(args) => commands::probe::run(ctx, args),
        Command::Render(args) => commands::render::run(ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "k3node", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print an error with the advice for its category, if it came from k3supkit.
fn report(ctx: &Context, err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    let Some(lib_err) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<k3supkit::Error>())
    else {
        return;
    };

    let category = lib_err.category();
    ui::hint(&format!("{}: {}", category.description(), category.advice()));

    if let k3supkit::Error::RemoteFailure { stdout, .. } = lib_err
        && ctx.verbose > 0
        && !stdout.trim().is_empty()
    {
        ui::hint("k3sup output:");
        for line in stdout.trim_end().lines() {
            ui::hint(line);
        }
    }
}
