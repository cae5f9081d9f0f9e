//! File manifests: path → content-hash mappings.
//!
//! A manifest describes a version's expected contents. It is either built
//! locally by hashing a file tree or received from the update server as a
//! JSON document. Keys are version-directory-relative paths with `/`
//! separators on every platform so that locally built manifests compare
//! against remote ones.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::{Result, UpdaterError};

/// Mapping from file path to SHA-256 content hash (lowercase hex).
///
/// Every key maps to exactly one hash; duplicate keys cannot occur because
/// the underlying map deduplicates on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileManifest(HashMap<String, String>);

impl FileManifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the hash for `path`.
    pub fn insert(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.0.insert(path.into(), hash.into());
    }

    /// Hash recorded for `path`, if any.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    /// Whether `path` is present.
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(path, hash)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for FileManifest {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Normalize a path relative to `root` into a manifest key: forward slashes,
/// no leading separator.
pub fn manifest_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut key = String::new();
    for component in relative.components() {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}

/// List every regular file under `root`, depth-first.
///
/// Directories themselves are not listed; symlinks are not followed. Fails
/// if `root` cannot be walked at all.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            UpdaterError::fs("walk file tree", root, io)
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
