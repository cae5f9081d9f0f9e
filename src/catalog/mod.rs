//! Version catalog: the version → metadata mapping published by the update
//! server, with a local-cache fallback for offline starts.
//!
//! The catalog is an owned object handed to the orchestrator, not a global.
//! Its state sits behind a read-write lock: [`VersionCatalog::refresh`] is
//! the single writer, lookups are concurrent readers.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::constants::VERSION_MAP_CACHE_FILE;
use crate::core::UpdaterError;
use crate::utils::{read_json_file, write_json_file};

/// Server-published metadata for one version.
///
/// Only `version` is required (it drives sorting); the remaining fields are
/// whatever the server chooses to publish.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionMap {
    /// Numeric version string, e.g. "003".
    pub version: String,
    /// Human-readable release name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the version was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
    /// Free-form release notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The version map document: version label → metadata.
pub type VersionMapDocument = HashMap<String, VersionMap>;

/// One installed version: directory name, absolute path, and catalog
/// metadata when the catalog knows the version.
#[derive(Debug, Clone)]
pub struct InstalledVersion {
    /// Numeric version string (the directory name).
    pub version: String,
    /// Absolute path of the version directory.
    pub path: PathBuf,
    /// Catalog metadata, absent for versions the server never published.
    pub map: Option<VersionMap>,
}

/// Orders version labels descending, numerically where both parse.
fn compare_versions_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        _ => b.cmp(a),
    }
}

/// Holds the latest fetched version map and resolves version metadata.
pub struct VersionCatalog {
    install_path: PathBuf,
    http: reqwest::Client,
    maps: RwLock<VersionMapDocument>,
}

impl VersionCatalog {
    /// Create an empty catalog for the given install directory.
    pub fn new(install_path: impl Into<PathBuf>, http: reqwest::Client) -> Self {
        Self { install_path: install_path.into(), http, maps: RwLock::new(VersionMapDocument::new()) }
    }

    fn cache_path(&self) -> PathBuf {
        self.install_path.join(VERSION_MAP_CACHE_FILE)
    }

    /// Fetch the version map from `url`, falling back to the local cache
    /// when the network fails.
    ///
    /// A successful network fetch rewrites the cache file; since that cache
    /// is the only offline fallback, a cache-write failure fails the whole
    /// call. When both the network and the cache fail, the returned error
    /// names both causes.
    pub async fn refresh(&self, url: &str) -> Result<()> {
        let fetched = self.fetch_remote(url).await;

        let (document, from_network) = match fetched {
            Ok(document) => (document, true),
            Err(remote_err) => {
                warn!("version map fetch failed, trying local cache: {remote_err}");
                match read_json_file::<VersionMapDocument>(&self.cache_path()) {
                    Ok(document) => (document, false),
                    Err(local_err) => {
                        return Err(UpdaterError::VersionMapUnavailable {
                            remote: remote_err.to_string(),
                            local: local_err.to_string(),
                        }
                        .into());
                    }
                }
            }
        };

        if from_network {
            write_json_file(&self.cache_path(), &document)
                .context("Failed to write version map cache")?;
            debug!("version map cache rewritten at {}", self.cache_path().display());
        }

        *self.maps.write().await = document;
        Ok(())
    }

    async fn fetch_remote(&self, url: &str) -> Result<VersionMapDocument> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpdaterError::network("version map fetch", e))?;

        if !response.status().is_success() {
            return Err(UpdaterError::HttpStatus {
                status: response.status(),
                url: url.to_string(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpdaterError::network("version map fetch", e))?;

        serde_json::from_str(&body)
            .map_err(|e| {
                UpdaterError::ManifestDecode {
                    document: "version map".into(),
                    origin: url.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Metadata for a version label. Unknown versions are a normal case and
    /// return `None`, never an error.
    pub async fn lookup(&self, version: &str) -> Option<VersionMap> {
        self.maps.read().await.get(version).cloned()
    }

    /// Number of versions the catalog currently knows about.
    pub async fn len(&self) -> usize {
        self.maps.read().await.len()
    }

    /// Whether the catalog holds no version metadata yet.
    pub async fn is_empty(&self) -> bool {
        self.maps.read().await.is_empty()
    }

    /// Enumerate installed version directories, newest first.
    ///
    /// Every subdirectory of the install path counts as a version; each is
    /// paired with catalog metadata when available.
    pub async fn list_installed(&self) -> Result<Vec<InstalledVersion>> {
        let metadata = std::fs::metadata(&self.install_path)
            .map_err(|e| UpdaterError::fs("stat install path", &self.install_path, e))?;
        if !metadata.is_dir() {
            return Err(UpdaterError::InstallPathInvalid { path: self.install_path.clone() }.into());
        }

        let entries = std::fs::read_dir(&self.install_path)
            .map_err(|e| UpdaterError::fs("read install path", &self.install_path, e))?;

        let mut versions = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| UpdaterError::fs("read install path", &self.install_path, e))?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let version = entry.file_name().to_string_lossy().into_owned();
            let map = self.lookup(&version).await;
            versions.push(InstalledVersion { version, path: entry.path(), map });
        }

        versions.sort_by(|a, b| compare_versions_desc(&a.version, &b.version));
        Ok(versions)
    }

    /// The newest installed version, or an error when none exist.
    pub async fn latest_installed(&self) -> Result<InstalledVersion> {
        self.list_installed()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                UpdaterError::NoVersionsInstalled { path: self.install_path.clone() }.into()
            })
    }
}
