//! Concurrent file-hashing pipeline.
//!
//! [`hash_file`] hashes a single file while streaming [`ProgressEvent`]s to
//! a caller-supplied channel; [`HashPool`](pool::HashPool) runs many such
//! tasks under a bounded concurrency limit and multiplexes their events into
//! one stream. Large game content files (`.pak`) can take a while, so the
//! actual digesting runs on a blocking thread while the async side turns
//! observed byte counts into throughput and ETA reports.

pub mod pool;

pub use pool::HashPool;

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tokio::sync::mpsc;

use crate::constants::EMPTY_FILE_SHA256;
use crate::core::{Result, UpdaterError};
use crate::progress::{ProgressEvent, ProgressMeter};

/// Pass-through reader that reports the length of every chunk read on an
/// internal channel before handing the bytes to the caller.
///
/// Purely an observation point: no buffering, no mutation of the data path.
/// Dropping the counter closes the channel, which is how the draining side
/// learns the copy loop has returned; completion is never inferred from
/// chunk sizes.
pub struct ByteCounter<R> {
    inner: R,
    counts: mpsc::UnboundedSender<usize>,
}

impl<R> ByteCounter<R> {
    /// Wrap `inner`, reporting chunk lengths on `counts`.
    pub fn new(inner: R, counts: mpsc::UnboundedSender<usize>) -> Self {
        Self { inner, counts }
    }
}

impl<R: Read> Read for ByteCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            // The receiver may already be gone; counting is best-effort.
            let _ = self.counts.send(n);
        }
        Ok(n)
    }
}

fn subject_of(path: &Path) -> String {
    path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Hash one file, emitting progress events and exactly one terminal event.
///
/// Event contract: zero or more progress events strictly before a single
/// terminal event (completion with the final hex digest, or error), and
/// nothing after it. An `Err` return means the terminal error event has
/// already been sent.
///
/// Zero-length files skip reading entirely: a zero-byte read never drives
/// the byte counter, so no natural completion signal would arrive. They
/// complete immediately with the well-known empty-input digest.
pub async fn hash_file(path: &Path, events: &mpsc::UnboundedSender<ProgressEvent>) -> Result<String> {
    let subject = subject_of(path);

    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) => {
            let _ = events.send(ProgressEvent::failed(
                &subject,
                Some(path.to_path_buf()),
                err.to_string(),
            ));
            return Err(UpdaterError::fs("stat file for hashing", path, err));
        }
    };

    if metadata.len() == 0 {
        let _ = events.send(ProgressEvent::completed(
            &subject,
            Some(path.to_path_buf()),
            Some(EMPTY_FILE_SHA256.to_string()),
        ));
        return Ok(EMPTY_FILE_SHA256.to_string());
    }

    let (count_tx, mut count_rx) = mpsc::unbounded_channel::<usize>();
    let digest_path = path.to_path_buf();
    let digesting = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
        let file = std::fs::File::open(&digest_path)?;
        let mut reader = ByteCounter::new(std::io::BufReader::new(file), count_tx);
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
        // count_tx drops here, closing the channel after the copy returns.
    });

    let mut meter = ProgressMeter::new(Some(metadata.len()));
    while let Some(chunk) = count_rx.recv().await {
        if let Some(snapshot) = meter.record(chunk as u64) {
            let _ = events.send(ProgressEvent::progress(
                &subject,
                Some(path.to_path_buf()),
                snapshot.mbps,
                snapshot.eta_seconds,
                snapshot.percent,
            ));
        }
    }

    match digesting.await {
        Ok(Ok(hash)) => {
            let _ = events.send(ProgressEvent::completed(
                &subject,
                Some(path.to_path_buf()),
                Some(hash.clone()),
            ));
            Ok(hash)
        }
        Ok(Err(err)) => {
            let _ = events.send(ProgressEvent::failed(
                &subject,
                Some(path.to_path_buf()),
                err.to_string(),
            ));
            Err(UpdaterError::fs("hash file", path, err))
        }
        Err(join_err) => {
            let _ = events.send(ProgressEvent::failed(
                &subject,
                Some(path.to_path_buf()),
                join_err.to_string(),
            ));
            Err(UpdaterError::fs("hash file", path, std::io::Error::other(join_err)))
        }
    }
}

/// Hash a file list and collect the events for inspection. Test helper kept
/// here so both the unit tests and the pool tests can use it.
#[cfg(test)]
pub(crate) async fn hash_collecting_events(
    path: std::path::PathBuf,
) -> (Result<String>, Vec<ProgressEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = hash_file(&path, &tx).await;
    drop(tx);
    let mut collected = Vec::new();
    while let Some(event) = rx.recv().await {
        collected.push(event);
    }
    (result, collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sha256_hex(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    #[tokio::test]
    async fn hashes_file_contents() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("game.pak");
        std::fs::write(&path, b"some pak data").unwrap();

        let (result, events) = hash_collecting_events(path).await;
        let hash = result.unwrap();
        assert_eq!(hash, sha256_hex(b"some pak data"));

        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(terminal[0].completed);
        assert_eq!(terminal[0].hash.as_deref(), Some(hash.as_str()));
        // The terminal event is the last one.
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn empty_file_short_circuits() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let (result, events) = hash_collecting_events(path).await;
        assert_eq!(result.unwrap(), EMPTY_FILE_SHA256);
        assert_eq!(events.len(), 1);
        assert!(events[0].completed);
        assert_eq!(events[0].hash.as_deref(), Some(EMPTY_FILE_SHA256));
    }

    #[tokio::test]
    async fn missing_file_emits_single_error_event() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("not-there.pak");

        let (result, events) = hash_collecting_events(path).await;
        assert!(result.is_err());
        assert_eq!(events.len(), 1);
        assert!(events[0].error.is_some());
        assert!(!events[0].completed);
    }

    #[tokio::test]
    async fn large_file_digest_matches() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("big.pak");
        let data = vec![0xa7u8; 1_000_000];
        std::fs::write(&path, &data).unwrap();

        let (result, events) = hash_collecting_events(path).await;
        assert_eq!(result.unwrap(), sha256_hex(&data));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[test]
    fn byte_counter_reports_every_chunk() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let data = vec![1u8; 300];
        let mut counter = ByteCounter::new(&data[..], tx);

        let mut buf = [0u8; 128];
        let mut total = 0;
        loop {
            let n = counter.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        drop(counter);

        let mut reported = 0;
        while let Ok(n) = rx.try_recv() {
            reported += n;
        }
        assert_eq!(total, 300);
        assert_eq!(reported, 300);
    }
}
