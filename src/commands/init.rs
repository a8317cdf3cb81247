use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config;
use crate::paths;
use crate::schema::StackConfig;
use crate::ui;

pub fn run(ctx: &Context, force: bool, yes: bool) -> Result<()> {
    let path = ctx
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_CONFIG_FILE));

    if path.exists() {
        if !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        if !yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Overwrite {}?", path.display()))
                .default(false)
                .interact()
                .context("Failed to read confirmation")?;
            if !confirmed {
                ui::info("Left existing declaration untouched");
                return Ok(());
            }
        }
    }

    write_default(&path)?;
    if !ctx.quiet {
        ui::success(&format!("Wrote {}", path.display()));
        ui::dim("Put job scripts in the asset directory, then run `gluestack synth`");
    }
    Ok(())
}

/// Write the built-in declaration, in the format the extension implies
fn write_default(path: &Path) -> Result<()> {
    config::save(&StackConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(path: &Path) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            config: Some(path.to_path_buf()),
        }
    }

    #[test]
    fn test_init_writes_loadable_declaration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gluestack.toml");
        run(&ctx(&path), false, false).unwrap();

        let loaded = config::load_file(&path).unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.jobs.len(), StackConfig::default().jobs.len());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gluestack.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        assert!(run(&ctx(&path), false, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        run(&ctx(&path), true, true).unwrap();
        assert!(config::load_file(&path).is_ok());
    }
}
