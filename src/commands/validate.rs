use anyhow::{Result, bail};
use std::path::Path;

use crate::Context;
use crate::engine::{self, synth};
use crate::ui;

pub fn run(ctx: &Context, template: Option<&Path>, strict: bool) -> Result<()> {
    let (label, template) = match template {
        Some(path) => (path.display().to_string(), synth::load_template(path)?),
        None => {
            let loaded = super::load(ctx)?;
            let synthesis = synth::synthesize(&loaded.config, &loaded.base_dir)?;
            (loaded.config.stack.name.clone(), synthesis.template)
        }
    };

    let report = engine::validate(&template);
    log::debug!(
        "{} finding(s) over {} resources",
        report.findings.len(),
        template.resources.len()
    );

    if !ctx.quiet || !report.passes(strict) {
        ui::header(&format!("Validating {label}"));
        println!();
        super::print_report(&report);
    }

    if !report.passes(strict) {
        if strict && !report.has_errors() {
            bail!("{label} has warnings (strict mode)");
        }
        bail!("{label} failed validation");
    }
    Ok(())
}
