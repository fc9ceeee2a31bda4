//! Configuration tree loading.
//!
//! The tree is read once at startup. Loading fails soft: a missing or
//! malformed document logs a warning and yields an empty tree so the
//! application stays usable with empty catalogs.

use std::path::{Path, PathBuf};

use automation_types::{ConfigTree, config::ConfigSchema};
use automation_util::path_from_env;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::ConfigLoadError;

/// Environment variable overriding the configuration path.
pub const CONFIG_PATH_ENV: &str = "AUTOMATION_CONFIG_PATH";

/// Conventional location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/apis.json";

/// Path of the configuration document: `AUTOMATION_CONFIG_PATH` when set, else `config/apis.json`.
pub fn default_config_path() -> PathBuf {
    path_from_env(CONFIG_PATH_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the tree at `path`, returning an empty tree on any failure.
pub fn load(path: &Path) -> ConfigTree {
    match try_load(path) {
        Ok(tree) => tree,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "configuration unavailable; using an empty tree");
            ConfigTree::default()
        }
    }
}

/// Loads the tree at `path`. Files ending in `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
pub fn try_load(path: &Path) -> Result<ConfigTree, ConfigLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse_document(path, &content)?;
    let schema = ConfigSchema::detect(&document);
    if schema == ConfigSchema::LegacyFlat {
        warn!(path = %path.display(), "legacy flat configuration detected; migrating without module/class bindings");
    }
    let tree = ConfigTree::from_document(document).map_err(|source| ConfigLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), api_count = tree.apis.len(), "configuration loaded");
    Ok(tree)
}

fn parse_document(path: &Path, content: &str) -> Result<Value, ConfigLoadError> {
    let is_yaml = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(content).map_err(|source| ConfigLoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(content).map_err(|source| ConfigLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
