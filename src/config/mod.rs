//! Client configuration.
//!
//! Settings live in a TOML file (`patchkit.toml`); the CLI can override any
//! of them with flags. Only the install path and update URL are mandatory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_HASH_CONCURRENCY, DEFAULT_KEEP_VERSIONS, RUN_VERSION_LATEST};

fn default_keep_versions() -> usize {
    DEFAULT_KEEP_VERSIONS
}

fn default_run_version() -> String {
    RUN_VERSION_LATEST.to_string()
}

fn default_send_stats() -> bool {
    true
}

fn default_hash_concurrency() -> usize {
    DEFAULT_HASH_CONCURRENCY
}

/// Updater settings, typically loaded from `patchkit.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Directory holding the numbered version folders.
    pub install_path: PathBuf,
    /// Base URL of the update server.
    pub update_url: String,
    /// How many installed versions to retain after a successful update.
    #[serde(default = "default_keep_versions")]
    pub keep_versions: usize,
    /// Which version the player runs; `latest` resolves to the newest
    /// installed one.
    #[serde(default = "default_run_version")]
    pub run_version: String,
    /// Whether to include host OS details and the installed-version list in
    /// update checks.
    #[serde(default = "default_send_stats")]
    pub send_stats: bool,
    /// Worker limit for the local hashing pool.
    #[serde(default = "default_hash_concurrency")]
    pub hash_concurrency: usize,
}

impl UpdaterConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(install_path: impl Into<PathBuf>, update_url: impl Into<String>) -> Self {
        Self {
            install_path: install_path.into(),
            update_url: update_url.into(),
            keep_versions: default_keep_versions(),
            run_version: default_run_version(),
            send_stats: default_send_stats(),
            hash_concurrency: default_hash_concurrency(),
        }
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file syntax in {}", path.display()))
    }

    /// Default location of the user's config file
    /// (`~/.config/patchkit/patchkit.toml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("patchkit").join("patchkit.toml"))
    }
}
