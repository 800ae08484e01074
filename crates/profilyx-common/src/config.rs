//! Configuration loading for profilyx.
//! Reads profilyx.toml from the current directory or path in PROFILYX_CONFIG env var.

use crate::error::{ProfilyxError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "./data/profilyx.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Rows per write batch during bulk vector loads. Each batch commits
    /// independently, so this bounds both memory and the loss window on a
    /// crash mid-load.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Also materialize the dense one-column-per-target layout.
    #[serde(default)]
    pub materialize_dense: bool,
}

fn default_batch_size() -> usize {
    32
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            materialize_dense: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    100
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

impl Config {
    /// Load from the given TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| ProfilyxError::Config(e.to_string()))
    }

    /// Load from `$PROFILYX_CONFIG`, falling back to `./profilyx.toml`,
    /// falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PROFILYX_CONFIG").unwrap_or_else(|_| "profilyx.toml".to_string());
        if Path::new(&path).exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}
