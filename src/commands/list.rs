use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::engine::synth;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let loaded = super::load(ctx)?;
    let config = &loaded.config;
    let synthesis = synth::synthesize(config, &loaded.base_dir)?;
    let resources = synthesis.graph.filter_by_target(target);
    if resources.is_empty() {
        match target {
            Some(t) => ui::warn(&format!("No resources match '{t}'")),
            None => ui::warn("No resources declared"),
        }
        return Ok(());
    }

    ui::header(&format!("{} ({} resources)", config.stack.name, resources.len()));
    println!();
    for resource in resources {
        println!(
            "  {:<44} {:<32} {}",
            resource.logical_id().bold(),
            resource.resource_type().cyan(),
            resource.id()
        );
        if !ctx.quiet {
            ui::dim(&resource.description());
        }
    }
    Ok(())
}
