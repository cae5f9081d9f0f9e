//! Delta computation between two file manifests, and the canonical hash
//! identifying a delta.
//!
//! The delta hash is the key the update server uses to map a specific
//! change-set to a downloadable package, so it must be deterministic: two
//! logically identical deltas must hash identically no matter what order
//! their entries were inserted or iterated in. `HashMap` iteration order is
//! unspecified, so paths are sorted before hashing. That sort is a
//! correctness requirement, not a style choice.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::manifest::FileManifest;

/// One operation transforming the current manifest toward the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOp {
    /// Present only in the next manifest.
    Added,
    /// Present in both with differing hashes.
    Modified,
    /// Present only in the current manifest.
    Removed,
}

impl DeltaOp {
    /// The canonical wire label fed into the delta hash.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Set of per-path operations. Unchanged paths are absent; no ordering is
/// implied. Ordering is imposed only at hashing time.
pub type DeltaSet = HashMap<String, DeltaOp>;

/// Compute the operations transforming `current` into `next`.
///
/// A path present in both manifests with equal hashes is a no-op and is
/// omitted from the result.
pub fn compute_delta(current: &FileManifest, next: &FileManifest) -> DeltaSet {
    let mut delta = DeltaSet::new();

    for (path, hash) in current.iter() {
        match next.get(path) {
            Some(next_hash) if next_hash != hash => {
                delta.insert(path.clone(), DeltaOp::Modified);
            }
            Some(_) => {}
            None => {
                delta.insert(path.clone(), DeltaOp::Removed);
            }
        }
    }

    for (path, _) in next.iter() {
        if !current.contains(path) {
            delta.insert(path.clone(), DeltaOp::Added);
        }
    }

    delta
}

/// Canonical SHA-256 identifier for a delta set.
///
/// Paths are sorted lexicographically ascending and the operation labels
/// (only the labels, not the paths) are fed into the hasher in that order.
pub fn delta_hash(delta: &DeltaSet) -> String {
    let mut paths: Vec<&String> = delta.keys().collect();
    paths.sort();

    let mut hasher = Sha256::new();
    for path in paths {
        hasher.update(delta[path].label().as_bytes());
    }
    hex::encode(hasher.finalize())
}
