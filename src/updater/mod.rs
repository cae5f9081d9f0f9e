//! Update orchestration: check, fetch, delta, resolve, download, clone,
//! apply, prune.
//!
//! One [`Updater`] owns the HTTP client, the [`VersionCatalog`] and the
//! client identity for the lifetime of the process. A full cycle walks
//! `CheckingForUpdate → FetchingManifest → ComputingDelta →
//! ResolvingPackage → Downloading → Cloning → Applying → Done`, short
//! circuiting to up-to-date when the server or the delta says there is
//! nothing to do. HTTP calls are serialized, with no parallel fan-out; the
//! only concurrent stage is the local hashing pool.

mod apply;
mod download;
mod identity;

pub use apply::apply_update;
pub use download::download;
pub use identity::load_or_create_client_id;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{InstalledVersion, VersionCatalog};
use crate::config::UpdaterConfig;
use crate::constants::{
    HTTP_TIMEOUT, RUN_VERSION_LATEST, UPDATE_CHECK_BACKOFF_START_MS, UPDATE_CHECK_RETRIES,
};
use crate::core::UpdaterError;
use crate::delta::{compute_delta, delta_hash};
use crate::hasher::HashPool;
use crate::manifest::{FileManifest, collect_files, manifest_key};
use crate::progress::ProgressEvent;
use crate::telemetry::{self, OsDistribution};
use crate::utils::{copy_dir, remove_dir_all};

/// Body of the update-check POST.
#[derive(Debug, Serialize)]
struct UpdateCheckRequest {
    client_id: String,
    os: OsDistribution,
    versions: Vec<String>,
    current_version: String,
}

/// Server's answer to an update check.
#[derive(Debug, Deserialize)]
struct UpdateCheckResponse {
    update_available: bool,
    latest_version: String,
}

/// Result of [`Updater::check_for_update`].
#[derive(Debug, Clone)]
pub struct UpdateCheck {
    /// Whether the server has something newer than the current version.
    pub update_available: bool,
    /// The newest version label the server knows.
    pub latest_version: String,
}

/// Result of a full [`Updater::update`] cycle.
#[derive(Debug)]
pub enum UpdateStatus {
    /// Local content already matches the latest published content.
    UpToDate,
    /// A new version directory was created and patched.
    Updated(InstalledVersion),
}

/// Top-level coordinator for the update cycle.
pub struct Updater {
    config: UpdaterConfig,
    http: reqwest::Client,
    catalog: VersionCatalog,
    client_id: String,
}

impl Updater {
    /// Build an updater: absolutize the install path, refresh the version
    /// catalog (with cache fallback) and load or create the client id.
    pub async fn new(mut config: UpdaterConfig) -> Result<Self> {
        config.install_path = std::path::absolute(&config.install_path)
            .map_err(|e| UpdaterError::fs("resolve install path", &config.install_path, e))?;

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let catalog = VersionCatalog::new(&config.install_path, http.clone());
        catalog
            .refresh(&format!("{}/update/versionmap", config.update_url))
            .await
            .context("Unable to update version map")?;

        let client_id = load_or_create_client_id(&config.install_path)?;

        Ok(Self { config, http, catalog, client_id })
    }

    /// The version catalog owned by this updater.
    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// The persisted client identity.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Ask the server whether an update is available.
    ///
    /// POSTs the client identity, optional OS/telemetry details, the
    /// installed version list and the current version, with bounded
    /// retry/backoff and a single in-flight request.
    pub async fn check_for_update(&self) -> Result<UpdateCheck> {
        let latest = self.catalog.latest_installed().await?;

        let (os, versions) = if self.config.send_stats {
            let installed = self
                .catalog
                .list_installed()
                .await
                .map(|list| list.into_iter().map(|v| v.version).collect())
                .unwrap_or_default();
            (telemetry::gather(), installed)
        } else {
            (OsDistribution::optout(), Vec::new())
        };

        let request = UpdateCheckRequest {
            client_id: self.client_id.clone(),
            os,
            versions,
            current_version: latest.version.clone(),
        };

        let url = format!("{}/update/check", self.config.update_url);
        let strategy = ExponentialBackoff::from_millis(UPDATE_CHECK_BACKOFF_START_MS)
            .map(jitter)
            .take(UPDATE_CHECK_RETRIES);

        let response = Retry::spawn(strategy, || async {
            let response = self
                .http
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| anyhow::Error::from(UpdaterError::network("update check", e)))?;

            // Server-side failures are worth a retry; client errors are not
            // going to improve.
            if response.status().is_server_error() {
                return Err(anyhow::Error::from(UpdaterError::HttpStatus {
                    status: response.status(),
                    url: url.clone(),
                }));
            }
            Ok::<_, anyhow::Error>(response)
        })
        .await?;

        if !response.status().is_success() {
            return Err(UpdaterError::HttpStatus {
                status: response.status(),
                url: url.clone(),
            }
            .into());
        }

        let body: UpdateCheckResponse = response.json().await.map_err(|e| {
            UpdaterError::ManifestDecode {
                document: "update check response".into(),
                origin: url.clone(),
                reason: e.to_string(),
            }
        })?;

        info!(
            update_available = body.update_available,
            latest_version = %body.latest_version,
            "update check complete"
        );
        Ok(UpdateCheck {
            update_available: body.update_available,
            latest_version: body.latest_version,
        })
    }

    /// Fetch the path → hash manifest for a version label (or `latest`).
    pub async fn remote_manifest(&self, label: &str) -> Result<FileManifest> {
        let url = format!("{}/update/hashes/{label}", self.config.update_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpdaterError::network("manifest fetch", e))?;

        if !response.status().is_success() {
            return Err(UpdaterError::HttpStatus { status: response.status(), url }.into());
        }

        let manifest: FileManifest = response.json().await.map_err(|e| {
            UpdaterError::ManifestDecode {
                document: "file manifest".into(),
                origin: url.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(manifest)
    }

    /// Resolve the package URL for a canonical delta hash.
    ///
    /// The server maps the change-set identity to a downloadable artifact;
    /// a response without `update_url` is a protocol violation.
    pub async fn resolve_package_url(&self, delta_hash: &str) -> Result<String> {
        let url = format!("{}/update/package/{delta_hash}", self.config.update_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| UpdaterError::network("package resolution", e))?;

        if !response.status().is_success() {
            return Err(UpdaterError::HttpStatus { status: response.status(), url }.into());
        }

        let mut body: HashMap<String, String> = response.json().await.map_err(|e| {
            UpdaterError::ManifestDecode {
                document: "package resolution".into(),
                origin: url.clone(),
                reason: e.to_string(),
            }
        })?;

        body.remove("update_url")
            .ok_or_else(|| UpdaterError::MissingField { field: "update_url".into(), endpoint: url }.into())
    }

    /// Download the artifact at `url` to `destination`. See
    /// [`download`] for the cancellation and progress contract.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        cancel: &CancellationToken,
        events: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<()> {
        download::download(&self.http, url, destination, cancel, events).await
    }

    /// Hash the current latest version's file tree, returning a manifest
    /// keyed by version-directory-relative paths.
    ///
    /// Failed files are reported through the event stream and simply missing
    /// from the result; the remote manifest will then classify them.
    pub async fn hash_installed_tree(
        &self,
        version: &InstalledVersion,
        events: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<FileManifest> {
        let files = collect_files(&version.path)?;
        let pool = HashPool::new(self.config.hash_concurrency);
        let absolute = pool.hash_files(files, events).await;

        Ok(absolute
            .iter()
            .map(|(path, hash)| (manifest_key(&version.path, Path::new(path)), hash.clone()))
            .collect())
    }

    /// Duplicate the latest installed version into a new version directory.
    ///
    /// With `preserve_original` the tree is copied; otherwise it is renamed.
    /// A copy that fails partway is not rolled back; the caller must treat
    /// the new directory as invalid on error.
    pub async fn clone_latest_version_to(
        &self,
        new_version: &str,
        preserve_original: bool,
    ) -> Result<PathBuf> {
        let latest = self.catalog.latest_installed().await?;
        let new_path = self.config.install_path.join(new_version);

        info!(
            "cloning version {} into {} (preserve: {preserve_original})",
            latest.version,
            new_path.display()
        );

        if preserve_original {
            copy_dir(&latest.path, &new_path).with_context(|| {
                format!("Failed to clone version {} to {new_version}", latest.version)
            })?;
        } else {
            std::fs::rename(&latest.path, &new_path)
                .map_err(|e| UpdaterError::fs("rename version directory", &latest.path, e))?;
        }

        Ok(new_path)
    }

    /// Apply a downloaded package onto a version directory.
    pub fn apply_update(&self, package: &Path, destination: &Path) -> Result<()> {
        apply::apply_update(package, destination)
    }

    /// Remove versions beyond the retention cap, oldest first. The version
    /// currently in use is never removed, even when it falls past the cap.
    pub async fn prune_old_versions(&self) -> Result<Vec<String>> {
        let versions = self.catalog.list_installed().await?;
        if versions.is_empty() {
            return Ok(Vec::new());
        }

        let in_use = if self.config.run_version == RUN_VERSION_LATEST {
            versions[0].version.clone()
        } else {
            self.config.run_version.clone()
        };

        let mut removed = Vec::new();
        for version in versions.iter().skip(self.config.keep_versions.max(1)) {
            if version.version == in_use {
                continue;
            }
            info!("pruning version {} at {}", version.version, version.path.display());
            remove_dir_all(&version.path)?;
            removed.push(version.version.clone());
        }
        Ok(removed)
    }

    fn next_version_label(current: &str, server_hint: &str) -> String {
        if !server_hint.is_empty() && server_hint != RUN_VERSION_LATEST {
            return server_hint.to_string();
        }
        match current.parse::<u64>() {
            Ok(n) => format!("{:0width$}", n + 1, width = current.len()),
            Err(_) => format!("{current}-next"),
        }
    }

    /// Run one full update cycle.
    ///
    /// Emits hashing and download progress on `events`; observes `cancel`
    /// during the download. Returns [`UpdateStatus::UpToDate`] when either
    /// the server reports no update or the computed delta is empty.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        events: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<UpdateStatus> {
        info!(phase = "checking-for-update", "starting update cycle");
        let check = self.check_for_update().await?;
        if !check.update_available {
            info!(phase = "up-to-date", "no update available");
            return Ok(UpdateStatus::UpToDate);
        }

        let latest = self.catalog.latest_installed().await?;

        info!(phase = "hashing", version = %latest.version, "hashing installed tree");
        let local = self.hash_installed_tree(&latest, events.clone()).await?;

        info!(phase = "fetching-manifest", "fetching remote manifest");
        let remote = self.remote_manifest(RUN_VERSION_LATEST).await?;

        info!(phase = "computing-delta", "comparing manifests");
        let delta = compute_delta(&local, &remote);
        if delta.is_empty() {
            info!(phase = "up-to-date", "content already matches the latest manifest");
            return Ok(UpdateStatus::UpToDate);
        }
        let delta_id = delta_hash(&delta);
        info!(phase = "resolving-package", delta = %delta_id, changes = delta.len(), "resolving package URL");

        let package_url = self.resolve_package_url(&delta_id).await?;

        let package_file = self.config.install_path.join(format!("update-{delta_id}.zip"));
        info!(phase = "downloading", url = %package_url, "downloading update package");
        self.download(&package_url, &package_file, cancel, events).await?;

        let new_version = Self::next_version_label(&latest.version, &check.latest_version);
        info!(phase = "cloning", from = %latest.version, to = %new_version, "cloning latest version");
        let new_path = self.clone_latest_version_to(&new_version, true).await?;

        info!(phase = "applying", "applying update package");
        self.apply_update(&package_file, &new_path)?;

        if let Err(err) = std::fs::remove_file(&package_file) {
            warn!("could not remove downloaded package {}: {err}", package_file.display());
        }

        if let Err(err) = self.prune_old_versions().await {
            warn!("retention pruning failed: {err}");
        }

        info!(phase = "done", version = %new_version, "update complete");
        let map = self.catalog.lookup(&new_version).await;
        Ok(UpdateStatus::Updated(InstalledVersion {
            version: new_version,
            path: new_path,
            map,
        }))
    }
}
