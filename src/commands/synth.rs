use anyhow::{Result, bail};
use std::path::Path;

use crate::Context;
use crate::engine::{self, synth};
use crate::ui;

pub fn run(ctx: &Context, out: &Path, to_stdout: bool) -> Result<()> {
    let loaded = super::load(ctx)?;
    let config = &loaded.config;

    let synthesis = synth::synthesize(config, &loaded.base_dir)?;

    let report = engine::validate(&synthesis.template);
    if report.has_errors() {
        super::print_report(&report);
        bail!("Template for {} failed validation", config.stack.name);
    }

    if to_stdout {
        print!("{}", synthesis.template.to_json_pretty()?);
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!("Synthesizing {}", config.stack.name));
    }

    let assembly = synth::write_assembly(config, &synthesis, out, ctx.quiet)?;

    if ctx.quiet {
        return Ok(());
    }

    if report.warnings().next().is_some() {
        ui::section("Warnings");
        super::print_report(&report);
    }

    ui::section("Resources");
    for (resource_type, count) in synthesis.template.type_counts() {
        ui::kv(resource_type, &count.to_string());
    }

    ui::section("Assembly");
    ui::kv("Template", &assembly.template_path.display().to_string());
    let total: u64 = synthesis.assets.iter().map(|a| a.size).sum();
    ui::kv(
        "Assets",
        &format!(
            "{} file(s), {}",
            assembly.manifest.assets.len(),
            ui::format_size(total)
        ),
    );
    for asset in &synthesis.assets {
        ui::dim(&format!(
            "{} {}",
            ui::short_hash(&asset.hash),
            asset.relative
        ));
    }

    println!();
    ui::success(&format!("Synthesized {}", config.stack.name));
    Ok(())
}
