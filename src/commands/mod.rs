//! Command implementations
//!
//! Every command loads the declaration the same way, then hands off to the
//! engine. Output goes through `ui` so `--quiet` behaves uniformly.

pub mod config;
pub mod diff;
pub mod graph;
pub mod init;
pub mod list;
pub mod synth;
pub mod validate;

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::Context;
use crate::config::ConfigSource;
use crate::engine::{Report, Severity};
use crate::schema::StackConfig;
use crate::ui;

/// A loaded declaration plus the directory its relative paths resolve against
pub struct Loaded {
    pub config: StackConfig,
    pub source: ConfigSource,
    pub base_dir: PathBuf,
}

/// Load the declaration named by `--config`, `./gluestack.toml`, or defaults
pub fn load(ctx: &Context) -> Result<Loaded> {
    let (config, source) = crate::config::load(ctx.config.as_deref())?;
    let base_dir = source.base_dir()?;
    log::info!("Using declaration from {source}");
    Ok(Loaded {
        config,
        source,
        base_dir,
    })
}

/// Print validation findings, errors first
pub fn print_report(report: &Report) {
    let mut findings: Vec<_> = report.findings.iter().collect();
    findings.sort_by_key(|f| f.severity);

    for finding in findings {
        let label = match finding.severity {
            Severity::Error => format!("{} {}", "✗".red(), "error".red().bold()),
            Severity::Warning => format!("{} {}", "⚠".yellow(), "warning".yellow().bold()),
        };
        let location = finding
            .resource
            .as_deref()
            .map(|r| format!(" {}", r.dimmed()))
            .unwrap_or_default();
        println!(
            "  {label}[{}]{location}: {}",
            finding.code, finding.message
        );
    }

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if errors == 0 && warnings == 0 {
        ui::success("No findings");
    } else {
        println!();
        ui::dim(&format!("{errors} error(s), {warnings} warning(s)"));
    }
}
