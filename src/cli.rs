use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::paths;

#[derive(Parser)]
#[command(name = "gluestack")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declare, validate and synthesize a scheduled Glue pipeline stack", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Declaration file (default: ./gluestack.toml, else built-in defaults)
    #[arg(short, long, global = true, env = paths::ENV_CONFIG)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build, validate and write the template and staged assets
    Synth(SynthArgs),

    /// Check a template for structural errors and risky settings
    Validate(ValidateArgs),

    /// Compare a fresh synthesis with the last written template
    Diff(DiffArgs),

    /// List declared resources
    List(ListArgs),

    /// Show the trigger chain from the schedule through every job
    Graph,

    /// Write the default declaration to gluestack.toml
    Init(InitArgs),

    /// Print the effective declaration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct SynthArgs {
    /// Output directory
    #[arg(short, long, env = paths::ENV_OUT_DIR, default_value = paths::DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Print the template to stdout instead of writing the assembly
    #[arg(long)]
    pub stdout: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Validate a template file instead of a fresh synthesis
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Template to compare against (default: the one in the output directory)
    #[arg(short, long)]
    pub against: Option<PathBuf>,

    /// Output directory holding the last written template
    #[arg(short, long, env = paths::ENV_OUT_DIR, default_value = paths::DEFAULT_OUT_DIR)]
    pub out: PathBuf,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Filter: a type (bucket, job, trigger, iam, glue) or type.name
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Overwrite an existing declaration
    #[arg(short, long)]
    pub force: bool,

    /// Do not ask before overwriting
    #[arg(short, long)]
    pub yes: bool,
}
