use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use k3supkit::{Action, OperationMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "k3node")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent k3s server install and agent join, driven by k3sup", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Node configuration file (TOML)
    #[arg(short, long, global = true, env = "K3NODE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install or join the node unless it is already set up
    Apply(ApplyArgs),

    /// Show what apply would do without running the install/join
    Plan(PlanArgs),

    /// Check whether the node is already set up
    Probe(ProbeArgs),

    /// Print the k3sup command line without running anything
    Render(RenderArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Node selection
// ============================================================================

/// Flags that pick and override the node configuration.
///
/// Precedence, lowest first: config file, `--set`, dedicated flags.
#[derive(Args, Debug, Clone, Default)]
pub struct NodeArgs {
    /// Node role
    #[arg(short, long, value_enum)]
    pub action: Option<ActionArg>,

    /// Target host address
    #[arg(long)]
    pub ip: Option<String>,

    /// Path to the k3sup binary
    #[arg(long, value_name = "PATH")]
    pub installer: Option<String>,

    /// Override a configuration key (repeatable), e.g. -e server_ip=10.0.0.1
    #[arg(short = 'e', long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Server,
    Agent,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Server => Action::Server,
            ActionArg::Agent => Action::Agent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Probe,
    Execute,
}

impl From<ModeArg> for OperationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Probe => OperationMode::Probe,
            ModeArg::Execute => OperationMode::Execute,
        }
    }
}

// ============================================================================
// Subcommand arguments
// ============================================================================

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Plan only: never spawn k3sup
    #[arg(long)]
    pub dry_run: bool,

    /// Kill each k3sup run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Run the non-mutating probe against the target
    #[arg(long)]
    pub probe: bool,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Kill the probe after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub node: NodeArgs,

    /// Which command line to print
    #[arg(long, value_enum, default_value_t = ModeArg::Execute)]
    pub mode: ModeArg,
}
