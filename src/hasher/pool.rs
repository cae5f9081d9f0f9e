//! Bounded-concurrency dispatcher over per-file hash tasks.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

use crate::hasher::hash_file;
use crate::manifest::FileManifest;
use crate::progress::ProgressEvent;

/// Runs up to N [`hash_file`] tasks concurrently over a file list, funneling
/// every event (progress and terminal) into one shared output channel.
///
/// Guarantees:
/// - at most N files are actively hashing at any instant,
/// - every submitted file produces exactly one terminal event,
/// - one file's failure never aborts the others,
/// - the output channel closes only after the last terminal event (the pool
///   owns the sender and drops it when every task has finished),
/// - the returned manifest contains entries only for files that completed
///   successfully.
#[derive(Debug, Clone, Copy)]
pub struct HashPool {
    concurrency: usize,
}

impl HashPool {
    /// Create a pool with the given worker limit (clamped to ≥1).
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// The configured worker limit.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Hash every file in `files`, sending all events to `events` and
    /// returning the path → hash manifest of successful completions.
    ///
    /// Takes the sender by value: when the pool finishes, the last sender
    /// clone drops and the caller's receive loop observes the close.
    pub async fn hash_files(
        &self,
        files: Vec<PathBuf>,
        events: mpsc::UnboundedSender<ProgressEvent>,
    ) -> FileManifest {
        let results: Vec<Option<(PathBuf, String)>> = stream::iter(files)
            .map(|path| {
                let events = events.clone();
                async move {
                    match hash_file(&path, &events).await {
                        Ok(hash) => Some((path, hash)),
                        Err(err) => {
                            // Already surfaced as this file's terminal error
                            // event; the run continues for the other files.
                            debug!("hashing {} failed: {err}", path.display());
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        drop(events);

        results
            .into_iter()
            .flatten()
            .map(|(path, hash)| (path.to_string_lossy().into_owned(), hash))
            .collect()
    }
}
