use crate::domain::model::RelationKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "errbot-charm")]
#[command(about = "Provisions and reconciles an errbot deployment")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run one reconciliation pass
    Reconcile(PassArgs),
    /// Show which handlers a pass would start with, without touching the system
    Plan(PassArgs),
    /// Show the persisted status and running bot processes
    Status {
        #[arg(long, default_value = DEFAULT_STATE_PATH)]
        state: PathBuf,
    },
}

pub const DEFAULT_STATE_PATH: &str = "/var/lib/errbot-charm/state.json";

#[derive(Debug, Clone, Args)]
pub struct PassArgs {
    /// Path to the TOML charm configuration
    #[arg(short, long, default_value = "charm-config.toml")]
    pub config: PathBuf,

    /// Where declared state persists between passes
    #[arg(long, default_value = DEFAULT_STATE_PATH)]
    pub state: PathBuf,

    /// Filesystem root the layout is placed under
    #[arg(long, default_value = "/")]
    pub root: PathBuf,

    /// Directory with template overrides
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Relations currently available to this unit
    #[arg(long = "relation", value_enum)]
    pub relations: Vec<RelationKind>,
}
