//! Script assets - discovery, content hashing and staging
//!
//! Assets are uploaded verbatim. A file's identity is its BLAKE3 hash, so
//! staging is idempotent and an unchanged script keeps its staged key.

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::paths;
use crate::progress;

/// A local file ready to be referenced by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    /// Path relative to the asset directory, `/`-separated
    pub relative: String,
    pub source: PathBuf,
    /// BLAKE3 hex digest of the contents
    pub hash: String,
    pub size: u64,
}

impl StagedAsset {
    /// Key of the staged copy in the staging bucket
    pub fn staging_key(&self) -> String {
        format!("{}/{}", self.hash, self.relative)
    }
}

/// Walk `dir` and hash every regular file, sorted by relative path
pub fn discover(dir: &Path) -> Result<Vec<StagedAsset>> {
    if !dir.is_dir() {
        bail!("Asset directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("Failed to strip prefix from {}", entry.path().display()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.into_path()));
    }

    let mut assets = files
        .into_par_iter()
        .map(|(relative, source)| hash_file(relative, source))
        .collect::<Result<Vec<_>>>()?;
    assets.sort_by(|a, b| a.relative.cmp(&b.relative));

    log::debug!("Discovered {} asset(s) in {}", assets.len(), dir.display());
    Ok(assets)
}

fn hash_file(relative: String, source: PathBuf) -> Result<StagedAsset> {
    let content =
        fs::read(&source).with_context(|| format!("Failed to read {}", source.display()))?;
    let hash = blake3::hash(&content).to_hex().to_string();
    log::trace!("{relative} {hash}");
    Ok(StagedAsset {
        relative,
        source,
        hash,
        size: content.len() as u64,
    })
}

/// One line of `assets.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source: PathBuf,
    pub hash: String,
    /// Staged copy, relative to the output directory
    pub staged: PathBuf,
    /// Key in the staging bucket
    pub staging_key: String,
    /// Logical ID of the destination bucket
    pub destination_bucket: String,
    pub destination_key: String,
}

/// Describes every staged asset of one synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub assets: Vec<ManifestEntry>,
}

impl AssetManifest {
    #[cfg(test)]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid {}", path.display()))
    }
}

/// Where staged assets are headed
pub struct Destination<'a> {
    /// Logical ID of the bucket
    pub bucket: &'a str,
    pub key_prefix: &'a str,
}

/// Copy assets under `out_dir` and write the manifest next to them
pub fn stage(
    assets: &[StagedAsset],
    out_dir: &Path,
    destination: &Destination<'_>,
    quiet: bool,
) -> Result<AssetManifest> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Could not create {}", out_dir.display()))?;

    let pb = progress::bar(assets.len() as u64, "Staging", quiet);
    let mut manifest = AssetManifest::default();

    for asset in assets {
        pb.set_message(asset.relative.clone());
        let dir = paths::staging_dir(out_dir, &asset.hash);
        let target = dir.join(&asset.relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        if !target.exists() {
            fs::copy(&asset.source, &target).with_context(|| {
                format!("Failed to stage {} to {}", asset.source.display(), target.display())
            })?;
        }

        manifest.assets.push(ManifestEntry {
            source: asset.source.clone(),
            hash: asset.hash.clone(),
            staged: target
                .strip_prefix(out_dir)
                .map_or_else(|_| target.clone(), Path::to_path_buf),
            staging_key: asset.staging_key(),
            destination_bucket: destination.bucket.to_string(),
            destination_key: format!("{}{}", destination.key_prefix, asset.relative),
        });
        pb.inc(1);
    }

    let manifest_path = out_dir.join(paths::ASSET_MANIFEST);
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize asset manifest")?;
    fs::write(&manifest_path, json + "\n")
        .with_context(|| format!("Could not write {}", manifest_path.display()))?;

    progress::finish(&pb, &format!("Staged {} asset(s)", assets.len()));
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn asset_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.py"), "print('b')\n").unwrap();
        fs::write(dir.path().join("a.py"), "print('a')\n").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/util.py"), "X = 1\n").unwrap();
        dir
    }

    #[test]
    fn test_discover_sorted_and_hashed() {
        let dir = asset_dir();
        let assets = discover(dir.path()).unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.relative.as_str()).collect();
        assert_eq!(names, vec!["a.py", "b.py", "lib/util.py"]);
        assert_eq!(assets[0].hash, blake3::hash(b"print('a')\n").to_hex().to_string());
        assert_eq!(assets[0].size, 11);
        assert_ne!(assets[0].hash, assets[1].hash);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_stage_writes_copies_and_manifest() {
        let src = asset_dir();
        let out = TempDir::new().unwrap();
        let assets = discover(src.path()).unwrap();
        let destination = Destination {
            bucket: "GlueScripts",
            key_prefix: "assets/",
        };

        let manifest = stage(&assets, out.path(), &destination, true).unwrap();
        assert_eq!(manifest.assets.len(), 3);

        let util = &manifest.assets[2];
        assert_eq!(util.destination_key, "assets/lib/util.py");
        assert_eq!(util.staging_key, format!("{}/lib/util.py", util.hash));
        assert_eq!(fs::read_to_string(out.path().join(&util.staged)).unwrap(), "X = 1\n");

        let reloaded = AssetManifest::load(&out.path().join(paths::ASSET_MANIFEST)).unwrap();
        assert_eq!(reloaded, manifest);

        // staging again is a no-op on existing copies
        assert_eq!(stage(&assets, out.path(), &destination, true).unwrap(), manifest);
    }
}
