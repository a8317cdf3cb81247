use anyhow::{Context, Result, bail};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::schema::StackConfig;

/// Where the effective declaration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from a file
    File(PathBuf),
    /// No file found; built-in defaults
    BuiltIn,
}

impl ConfigSource {
    /// Directory relative paths in the declaration resolve against
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self {
            Self::File(path) => Ok(path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)),
            Self::BuiltIn => {
                std::env::current_dir().context("Could not determine working directory")
            }
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

/// Serialization format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Load and validate the declaration
///
/// Lookup order:
/// 1. explicit path (`--config` / `GLUESTACK_CONFIG`), which must exist
/// 2. `./gluestack.toml`
/// 3. built-in defaults
pub fn load(explicit: Option<&Path>) -> Result<(StackConfig, ConfigSource)> {
    let candidate = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Some(path.to_path_buf())
        }
        None => {
            let local = PathBuf::from(paths::DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        }
    };

    let (config, source) = match candidate {
        Some(path) => {
            log::debug!("Loading declaration from {}", path.display());
            (load_file(&path)?, ConfigSource::File(path))
        }
        None => {
            log::debug!("No declaration file found, using built-in defaults");
            (StackConfig::default(), ConfigSource::BuiltIn)
        }
    };

    config
        .validate()
        .with_context(|| format!("Invalid declaration in {source}"))?;

    Ok((config, source))
}

/// Parse a declaration file without validating it
pub fn load_file(path: &Path) -> Result<StackConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;

    match ConfigFormat::from_path(path) {
        ConfigFormat::Json => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display())),
        ConfigFormat::Toml => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display())),
    }
}

/// Render a declaration in the format its path implies
pub fn render(config: &StackConfig, format: ConfigFormat) -> Result<String> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).context("Failed to serialize config")
        }
        ConfigFormat::Toml => toml::to_string_pretty(config).context("Failed to serialize config"),
    }
}

/// Write a declaration to disk
pub fn save(config: &StackConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let content = render(config, ConfigFormat::from_path(path))?;
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn test_save_then_load_toml_and_json() {
        let dir = TempDir::new().unwrap();
        let mut config = StackConfig::default();
        config.stack.name = "RoundTrip".to_string();

        for file in ["stack.toml", "nested/stack.json"] {
            let path = dir.path().join(file);
            save(&config, &path).unwrap();
            let (loaded, source) = load(Some(&path)).unwrap();
            assert_eq!(loaded.stack.name, "RoundTrip");
            assert_eq!(source, ConfigSource::File(path.clone()));
            assert_eq!(source.base_dir().unwrap(), path.parent().unwrap());
        }
    }

    #[test]
    fn test_invalid_declaration_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[stack]\nname = \"has spaces\"\n").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid stack name"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a")), ConfigFormat::Toml);
    }

    #[test]
    fn test_file_source_without_parent_uses_cwd() {
        let source = ConfigSource::File(PathBuf::from("gluestack.toml"));
        assert_eq!(source.base_dir().unwrap(), PathBuf::from("."));
    }
}
