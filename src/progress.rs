//! Progress events emitted by the hashing pipeline and the downloader.
//!
//! Both producers speak the same event shape: zero or more progress events
//! followed by exactly one terminal event (completion or error) per subject.
//! Consumers must drain the channel until it closes; the producers close it
//! explicitly after their read loops return rather than inferring completion
//! from chunk sizes.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::constants::PROGRESS_REPORT_INTERVAL;

/// One progress or terminal event for a hash or download subject.
///
/// Terminal events carry either a final `hash`/`completed = true` pair (for
/// hashing; downloads complete without a hash) or an `error`. No events
/// follow a terminal event for the same subject.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Short identity of the work unit: file name for hashing, URL for a
    /// download.
    pub subject: String,
    /// Full path of the file being hashed or written, when applicable.
    pub path: Option<PathBuf>,
    /// Throughput over the last reporting interval, in MB/s.
    pub mbps: f64,
    /// Estimated seconds remaining. Absent when the last interval moved no
    /// bytes (rate is undefined) or the total size is unknown.
    pub eta_seconds: Option<f64>,
    /// Percent complete, 0.0 when the total size is unknown.
    pub percent: f64,
    /// Set on the successful terminal event.
    pub completed: bool,
    /// Final hex digest, present only on a hash task's completion event.
    pub hash: Option<String>,
    /// Failure description, present only on a terminal error event.
    pub error: Option<String>,
}

impl ProgressEvent {
    /// An intermediate (non-terminal) progress report.
    pub fn progress(
        subject: impl Into<String>,
        path: Option<PathBuf>,
        mbps: f64,
        eta_seconds: Option<f64>,
        percent: f64,
    ) -> Self {
        Self {
            subject: subject.into(),
            path,
            mbps,
            eta_seconds,
            percent,
            completed: false,
            hash: None,
            error: None,
        }
    }

    /// The terminal completion event, optionally carrying a final digest.
    pub fn completed(subject: impl Into<String>, path: Option<PathBuf>, hash: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            path,
            mbps: 0.0,
            eta_seconds: None,
            percent: 100.0,
            completed: true,
            hash,
            error: None,
        }
    }

    /// The terminal error event.
    pub fn failed(subject: impl Into<String>, path: Option<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            path,
            mbps: 0.0,
            eta_seconds: None,
            percent: 0.0,
            completed: false,
            hash: None,
            error: Some(error.into()),
        }
    }

    /// Whether this event ends its subject's stream.
    pub fn is_terminal(&self) -> bool {
        self.completed || self.error.is_some()
    }
}

/// Interval-based throughput aggregator shared by hashing and download.
///
/// Callers feed observed chunk sizes through [`record`](Self::record); once
/// the reporting interval has elapsed it returns a rate/ETA/percent snapshot
/// and resets its interval counters.
#[derive(Debug)]
pub struct ProgressMeter {
    total_bytes: Option<u64>,
    transferred: u64,
    interval_bytes: u64,
    last_report: Instant,
    interval: Duration,
}

/// One snapshot produced by [`ProgressMeter::record`].
#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    /// Throughput over the elapsed interval, MB/s.
    pub mbps: f64,
    /// Seconds remaining at the interval rate; `None` when the rate is zero
    /// or the total is unknown.
    pub eta_seconds: Option<f64>,
    /// Percent complete; 0.0 when the total is unknown.
    pub percent: f64,
}

impl ProgressMeter {
    /// Create a meter for a transfer of `total_bytes` (None when the size is
    /// not known up front, e.g. a response without Content-Length).
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes,
            transferred: 0,
            interval_bytes: 0,
            last_report: Instant::now(),
            interval: PROGRESS_REPORT_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_interval(total_bytes: Option<u64>, interval: Duration) -> Self {
        Self { interval, ..Self::new(total_bytes) }
    }

    /// Record `len` transferred bytes. Returns a snapshot when the reporting
    /// interval has elapsed, resetting the interval counters.
    pub fn record(&mut self, len: u64) -> Option<ProgressSnapshot> {
        self.transferred += len;
        self.interval_bytes += len;

        let elapsed = self.last_report.elapsed();
        if elapsed < self.interval {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = if secs > 0.0 { self.interval_bytes as f64 / secs } else { 0.0 };
        let mbps = bytes_per_sec / 1024.0 / 1024.0;

        // Rate of zero would divide to infinity; report no ETA instead.
        let eta_seconds = match self.total_bytes {
            Some(total) if bytes_per_sec > 0.0 => {
                Some(total.saturating_sub(self.transferred) as f64 / bytes_per_sec)
            }
            _ => None,
        };

        let percent = match self.total_bytes {
            Some(total) if total > 0 => (self.transferred as f64 / total as f64) * 100.0,
            _ => 0.0,
        };

        self.last_report = Instant::now();
        self.interval_bytes = 0;

        Some(ProgressSnapshot { mbps, eta_seconds, percent })
    }

    /// Total bytes recorded so far.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(ProgressEvent::completed("a", None, None).is_terminal());
        assert!(ProgressEvent::failed("a", None, "x").is_terminal());
        assert!(!ProgressEvent::progress("a", None, 1.0, None, 10.0).is_terminal());
    }

    #[test]
    fn meter_reports_after_interval() {
        let mut meter = ProgressMeter::with_interval(Some(1000), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        let snap = meter.record(250).expect("interval elapsed");
        assert!(snap.mbps > 0.0);
        assert!((snap.percent - 25.0).abs() < f64::EPSILON);
        assert!(snap.eta_seconds.is_some());
    }

    #[test]
    fn meter_holds_before_interval() {
        let mut meter = ProgressMeter::new(Some(1000));
        // Interval is one second; an immediate record must not report.
        assert!(meter.record(100).is_none());
        assert_eq!(meter.transferred(), 100);
    }

    #[test]
    fn eta_omitted_when_nothing_moved() {
        let mut meter = ProgressMeter::with_interval(Some(1000), Duration::ZERO);
        let snap = meter.record(0).expect("interval elapsed");
        assert!(snap.eta_seconds.is_none());
    }

    #[test]
    fn unknown_total_gives_no_percent() {
        let mut meter = ProgressMeter::with_interval(None, Duration::ZERO);
        let snap = meter.record(512).expect("interval elapsed");
        assert!((snap.percent - 0.0).abs() < f64::EPSILON);
        assert!(snap.eta_seconds.is_none());
    }
}
