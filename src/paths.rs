//! Path resolution for declarations, assets and synthesis output
//!
//! # Environment Variables
//!
//! - `GLUESTACK_CONFIG` - Declaration file to load instead of `./gluestack.toml`
//! - `GLUESTACK_OUT` - Output directory instead of `./stack.out`
//!
//! Relative paths inside a declaration (the asset directory) resolve
//! against the directory containing the declaration file, so a stack can
//! be synthesized from anywhere.

use std::path::{Path, PathBuf};

/// Environment variable for the declaration file
pub const ENV_CONFIG: &str = "GLUESTACK_CONFIG";

/// Environment variable for the synthesis output directory
pub const ENV_OUT_DIR: &str = "GLUESTACK_OUT";

/// Declaration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gluestack.toml";

/// Synthesis output directory
pub const DEFAULT_OUT_DIR: &str = "stack.out";

/// Name of the asset manifest inside the output directory
pub const ASSET_MANIFEST: &str = "assets.json";

/// Expand `~` and environment variables in a path
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand a path and anchor it at `base` if it is relative
pub fn resolve(base: &Path, path: &str) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Where the template for a stack is written
pub fn template_path(out_dir: &Path, stack_name: &str) -> PathBuf {
    out_dir.join(format!("{stack_name}.template.json"))
}

/// Staging directory for one asset hash
pub fn staging_dir(out_dir: &Path, hash: &str) -> PathBuf {
    out_dir.join(format!("asset.{hash}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_GLUESTACK_VAR_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_GLUESTACK_VAR_12345/file")
        );
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let base = Path::new("/work/pipeline");
        assert_eq!(
            resolve(base, "./assets/"),
            PathBuf::from("/work/pipeline/./assets/")
        );
        assert_eq!(resolve(base, "/srv/scripts"), PathBuf::from("/srv/scripts"));
    }

    #[test]
    fn test_output_layout() {
        let out = Path::new("stack.out");
        assert_eq!(
            template_path(out, "FinalCloudProjectV2Stack"),
            PathBuf::from("stack.out/FinalCloudProjectV2Stack.template.json")
        );
        assert_eq!(
            staging_dir(out, "ab12"),
            PathBuf::from("stack.out/asset.ab12")
        );
    }

    #[test]
    fn test_env_var_constants() {
        assert_eq!(ENV_CONFIG, "GLUESTACK_CONFIG");
        assert_eq!(ENV_OUT_DIR, "GLUESTACK_OUT");
    }
}
