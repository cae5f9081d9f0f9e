//! Error handling for patchkit
//!
//! The error system is designed around two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Network**: [`UpdaterError::Network`], [`UpdaterError::HttpStatus`]:
//!   transient failures of the update-check, manifest, package-resolution or
//!   download requests. Eligible for bounded retry where the calling policy
//!   allows it.
//! - **Local I/O**: [`UpdaterError::FileSystem`], [`UpdaterError::Io`]:
//!   stat/open/read/write failures. Never retried, surfaced immediately.
//! - **Data integrity**: [`UpdaterError::ManifestDecode`],
//!   [`UpdaterError::MissingField`], [`UpdaterError::Archive`]: malformed
//!   server documents or corrupt packages. Fatal to the current operation.
//! - **Cancellation**: [`UpdaterError::Cancelled`]: a download aborted by
//!   the caller's signal, distinguished from generic I/O failure so callers
//!   can tell user-abort from breakage.

use colored::Colorize;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for patchkit operations.
///
/// Each variant carries enough context (file path, version label, URL,
/// underlying cause) for the failure to be logged or displayed without the
/// caller inspecting internal state.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// An HTTP request could not be completed.
    #[error("network error during {operation}: {source}")]
    Network {
        /// The operation that failed (e.g. "update check", "manifest fetch").
        operation: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    #[error("server returned {status} for {url}")]
    HttpStatus {
        /// HTTP status code received.
        status: reqwest::StatusCode,
        /// The request URL.
        url: String,
    },

    /// A server document could not be decoded.
    #[error("invalid {document} document from {origin}: {reason}")]
    ManifestDecode {
        /// What was being decoded (e.g. "version map", "file manifest").
        document: String,
        /// Where it came from (URL or file path).
        origin: String,
        /// Decoder error text.
        reason: String,
    },

    /// A server response was missing a field the protocol requires.
    #[error("server response from {endpoint} is missing required field '{field}'")]
    MissingField {
        /// The field that was absent.
        field: String,
        /// The endpoint that produced the response.
        endpoint: String,
    },

    /// The version map could not be obtained from the network nor from the
    /// local cache. Both causes are preserved.
    #[error("version map unavailable: remote returned '{remote}' and local copy returned '{local}'")]
    VersionMapUnavailable {
        /// Why the network fetch failed.
        remote: String,
        /// Why the cache read failed.
        local: String,
    },

    /// A filesystem operation failed.
    #[error("file system error: {operation} on {path}")]
    FileSystem {
        /// The operation that failed (e.g. "clone version directory").
        operation: String,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The install path does not exist or is not a directory.
    #[error("install path is not a directory: {path}")]
    InstallPathInvalid {
        /// The offending path.
        path: PathBuf,
    },

    /// No version subdirectories were found in the install path.
    #[error("no installed versions found in {path}")]
    NoVersionsInstalled {
        /// The install path that was scanned.
        path: PathBuf,
    },

    /// A downloaded package could not be extracted.
    #[error("failed to apply package {package}: {reason}")]
    Archive {
        /// Path to the package file.
        package: PathBuf,
        /// Why extraction failed.
        reason: String,
    },

    /// A download was aborted by the caller's cancellation signal.
    #[error("download of {url} was cancelled")]
    Cancelled {
        /// The URL whose transfer was aborted.
        url: String,
    },

    /// Generic I/O error propagated from std.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UpdaterError {
    /// Build a [`UpdaterError::Network`] with operation context.
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network { operation: operation.into(), source }
    }

    /// Build a [`UpdaterError::FileSystem`] with operation context.
    pub fn fs(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem { operation: operation.into(), path: path.into(), source }
    }

    /// Whether this error is a cancellation rather than a real failure.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// A user-facing error wrapper adding a suggestion line.
///
/// Used by the CLI entry point to print actionable messages instead of bare
/// debug output.
pub struct ErrorContext {
    /// The error being displayed.
    pub error: anyhow::Error,
    /// Optional remediation hint shown below the error.
    pub suggestion: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without a suggestion.
    pub fn new(error: anyhow::Error) -> Self {
        Self { error, suggestion: None }
    }

    /// Attach a remediation hint.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print the error (and suggestion, if any) to stderr with color.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        for cause in self.error.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".yellow(), cause);
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("\n{} {}", "hint:".cyan().bold(), suggestion);
        }
    }
}

/// Convert any error into a user-friendly [`ErrorContext`] with a suggestion
/// matched to the failure category.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<UpdaterError>() {
        Some(UpdaterError::Network { .. } | UpdaterError::HttpStatus { .. }) => {
            Some("Check your network connection and the configured update URL".to_string())
        }
        Some(UpdaterError::VersionMapUnavailable { .. }) => Some(
            "The update server is unreachable and no cached version map exists yet. \
             Connect once so the cache can be written"
                .to_string(),
        ),
        Some(UpdaterError::InstallPathInvalid { path }) => Some(format!(
            "Create the install directory or point --install-path somewhere else: {}",
            path.display()
        )),
        Some(UpdaterError::NoVersionsInstalled { .. }) => {
            Some("The install directory must contain at least one version folder (e.g. 001)".to_string())
        }
        Some(UpdaterError::Archive { .. }) => {
            Some("The downloaded package may be corrupt; re-run the update".to_string())
        }
        _ => None,
    };

    let ctx = ErrorContext::new(error);
    match suggestion {
        Some(s) => ctx.with_suggestion(s),
        None => ctx,
    }
}
