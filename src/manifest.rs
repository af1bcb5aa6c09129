//! Manifest Loading - Build documents from disk

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::build::Build;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported manifest format: {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
}

/// Load a `Build` from a `.json`, `.yaml` or `.yml` file
pub fn load_build(path: &Path) -> Result<Build, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let content = |path: &Path| {
        fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    match extension.as_deref() {
        Some("json") => serde_json::from_str(&content(path)?).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content(path)?).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}
