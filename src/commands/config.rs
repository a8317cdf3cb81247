use anyhow::Result;

use crate::Context;
use crate::config::{self, ConfigFormat, ConfigSource};

pub fn run(ctx: &Context) -> Result<()> {
    let loaded = super::load(ctx)?;
    let format = match &loaded.source {
        ConfigSource::File(path) => ConfigFormat::from_path(path),
        ConfigSource::BuiltIn => ConfigFormat::Toml,
    };
    if !ctx.quiet {
        eprintln!("# {}", loaded.source);
    }
    print!("{}", config::render(&loaded.config, format)?);
    Ok(())
}
