use anyhow::Result;
use declarative::{Template, diff_templates};
use std::path::Path;

use crate::Context;
use crate::engine::{differ, synth};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, against: Option<&Path>, out: &Path) -> Result<()> {
    let loaded = super::load(ctx)?;
    let config = &loaded.config;
    let synthesis = synth::synthesize(config, &loaded.base_dir)?;

    let previous_path = against.map_or_else(
        || paths::template_path(out, &config.stack.name),
        Path::to_path_buf,
    );

    ui::header(&format!("Diff {}", config.stack.name));

    let previous = if previous_path.exists() {
        ui::kv("Against", &previous_path.display().to_string());
        synth::load_template(&previous_path)?
    } else {
        ui::dim(&format!(
            "No template at {}, comparing against an empty stack",
            previous_path.display()
        ));
        Template::empty()
    };

    let diffs = diff_templates(&previous, &synthesis.template);
    differ::display_diff(&diffs);
    Ok(())
}
