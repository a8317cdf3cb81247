mod assets;
mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod schema;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Explicit declaration file from `--config` / `GLUESTACK_CONFIG`
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
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
        config: cli.config,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Synth(args) => commands::synth::run(&ctx, &args.out, args.stdout),
        Command::Validate(args) => {
            commands::validate::run(&ctx, args.template.as_deref(), args.strict)
        }
        Command::Diff(args) => commands::diff::run(&ctx, args.against.as_deref(), &args.out),
        Command::List(args) => commands::list::run(&ctx, args.target.as_deref()),
        Command::Graph => commands::graph::run(&ctx),
        Command::Init(args) => commands::init::run(&ctx, args.force, args.yes),
        Command::Config => commands::config::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "gluestack", &mut io::stdout());
            Ok(())
        }
    }
}
