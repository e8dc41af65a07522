//! Hook configuration loading.
//!
//! Loading flow:
//! 1. Merge JSON files (a directory of `*.json` in name order, or one file)
//! 2. Merge `RETRACE_HOOKS_*` environment variables over the files
//! 3. Flatten the merged tree into dotted keys
//!
//! Environment keys use `__` as the nesting separator and are lowercased, so
//! `RETRACE_HOOKS_PRE_RETRACE__TIMEOUT=120` sets `pre_retrace.timeout`.
//! Missing files and a missing directory are not errors; they simply
//! contribute nothing.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json};
use serde_json::Value;
use tracing::debug;

use crate::config::FlatConfig;
use crate::errors::Result;

/// Directory searched by [`load_hooks_config`].
pub const DEFAULT_CONFIG_DIR: &str = "/etc/retrace-server/hooks";

/// Prefix of environment variables that override file configuration.
pub const ENV_PREFIX: &str = "RETRACE_HOOKS_";

/// Load configuration from [`DEFAULT_CONFIG_DIR`] with env var overrides.
pub fn load_hooks_config() -> Result<FlatConfig> {
    load_hooks_config_from_dir(Path::new(DEFAULT_CONFIG_DIR))
}

/// Load every `*.json` file in `dir` (sorted by name, later files win) with
/// env var overrides.
pub fn load_hooks_config_from_dir(dir: &Path) -> Result<FlatConfig> {
    let files = config_files(dir)?;
    debug!(dir = %dir.display(), count = files.len(), "loading hook configuration directory");

    let figment = files
        .iter()
        .fold(Figment::new(), |figment, file| figment.merge(Json::file(file)));
    extract(figment)
}

/// Load a single JSON file with env var overrides.
pub fn load_hooks_config_from_path(path: &Path) -> Result<FlatConfig> {
    if path.exists() {
        debug!(path = %path.display(), "loading hook configuration file");
    } else {
        debug!(path = %path.display(), "hook configuration file not found, using environment only");
    }
    extract(Figment::new().merge(Json::file(path)))
}

fn extract(figment: Figment) -> Result<FlatConfig> {
    let merged: Value = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    let config = FlatConfig::from_value(merged)?;
    debug!(keys = config.len(), "hook configuration loaded");
    Ok(config)
}

/// JSON files directly inside `dir`, sorted by file name.
fn config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_files_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("20-site.json"), "{}").unwrap();
        fs::write(tmp.path().join("10-base.json"), "{}").unwrap();
        fs::write(tmp.path().join("README"), "not config").unwrap();
        fs::create_dir(tmp.path().join("30-dir.json")).unwrap();

        let files = config_files(tmp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-base.json", "20-site.json"]);
    }

    #[test]
    fn test_config_files_missing_dir_is_empty() {
        let files = config_files(Path::new("/nonexistent/retrace/hooks")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_later_files_override_earlier() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("10-base.json"),
            r#"{"main": {"timeout": 300, "hookdir": "/srv/hooks"}}"#,
        )
        .unwrap();
        fs::write(tmp.path().join("20-site.json"), r#"{"main": {"timeout": 60}}"#).unwrap();

        let config = load_hooks_config_from_dir(tmp.path()).unwrap();
        assert_eq!(config.get("main.timeout"), Some(&json!(60)));
        assert_eq!(config.get("main.hookdir"), Some(&json!("/srv/hooks")));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hooks.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_hooks_config_from_path(&path).is_err());
    }
}
