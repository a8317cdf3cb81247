//! Cloud assembly - the template plus staged assets on disk

use anyhow::{Context, Result};
use declarative::{ResourceGraph, Template};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assets::{self, AssetManifest, Destination, StagedAsset};
use crate::paths;
use crate::schema::StackConfig;

/// A synthesized stack, not yet written
#[derive(Debug)]
pub struct Synthesis {
    /// The graph the template was rendered from
    pub graph: ResourceGraph,
    pub template: Template,
    pub assets: Vec<StagedAsset>,
}

/// Discover assets relative to `base_dir`, build the graph and render it
pub fn synthesize(config: &StackConfig, base_dir: &Path) -> Result<Synthesis> {
    let asset_dir = paths::resolve(base_dir, &config.assets.source);
    let assets = assets::discover(&asset_dir)
        .with_context(|| format!("Could not load assets for {}", config.stack.name))?;

    let graph = super::build_stack(config, &assets)
        .with_context(|| format!("Could not build stack {}", config.stack.name))?;
    let template = Template::synthesize(&graph, Some(&config.stack.description))
        .context("Could not synthesize template")?;

    Ok(Synthesis {
        graph,
        template,
        assets,
    })
}

/// Files written for one synthesis
#[derive(Debug)]
pub struct Assembly {
    pub template_path: PathBuf,
    pub manifest: AssetManifest,
}

/// Write the template and stage every asset under `out_dir`
pub fn write_assembly(
    config: &StackConfig,
    synthesis: &Synthesis,
    out_dir: &Path,
    quiet: bool,
) -> Result<Assembly> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Could not create {}", out_dir.display()))?;

    let template_path = paths::template_path(out_dir, &config.stack.name);
    let json = synthesis
        .template
        .to_json_pretty()
        .context("Failed to serialize template")?;
    fs::write(&template_path, json)
        .with_context(|| format!("Could not write {}", template_path.display()))?;
    log::info!("Wrote {}", template_path.display());

    let scripts_bucket = declarative::logical_id(&config.buckets.scripts.id);
    let destination = Destination {
        bucket: &scripts_bucket,
        key_prefix: &config.assets.key_prefix,
    };
    let manifest = assets::stage(&synthesis.assets, out_dir, &destination, quiet)?;

    Ok(Assembly {
        template_path,
        manifest,
    })
}

/// Load a previously written template
pub fn load_template(path: &Path) -> Result<Template> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read template {}", path.display()))?;
    Template::from_json(&content).with_context(|| format!("Invalid template {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::types;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        fs::create_dir(&assets).unwrap();
        for job in StackConfig::default().jobs {
            fs::write(assets.join(&job.script), format!("# {}\n", job.name)).unwrap();
        }
        dir
    }

    #[test]
    fn test_synthesize_and_write() {
        let project = project();
        let config = StackConfig::default();
        let synthesis = synthesize(&config, project.path()).unwrap();
        assert_eq!(synthesis.assets.len(), 3);
        assert_eq!(synthesis.graph.len(), synthesis.template.resources.len());

        let out = project.path().join("stack.out");
        let assembly = write_assembly(&config, &synthesis, &out, true).unwrap();
        assert_eq!(
            assembly.template_path,
            out.join("FinalCloudProjectV2Stack.template.json")
        );
        assert_eq!(assembly.manifest.assets.len(), 3);
        assert!(out.join(paths::ASSET_MANIFEST).exists());

        let reloaded = load_template(&assembly.template_path).unwrap();
        assert_eq!(reloaded.count_of_type(types::JOB), 3);
        assert_eq!(
            reloaded.to_json_pretty().unwrap(),
            synthesis.template.to_json_pretty().unwrap()
        );
    }

    #[test]
    fn test_missing_script_fails_synthesis() {
        let project = project();
        fs::remove_file(project.path().join("assets/merge_parquet_final.py")).unwrap();
        let err = synthesize(&StackConfig::default(), project.path()).unwrap_err();
        assert!(format!("{err:#}").contains("merge_parquet_final.py"));
    }

    #[test]
    fn test_load_template_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.json");
        fs::write(&path, "{\"AWSTemplateFormatVersion\": \"2000-01-01\", \"Resources\": {}}").unwrap();
        assert!(load_template(&path).is_err());
    }
}
