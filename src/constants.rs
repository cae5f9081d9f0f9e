//! Global constants used throughout the patchkit codebase.
//!
//! Timeout durations, retry parameters, well-known file names and other
//! numeric constants shared across modules. Defining them centrally keeps
//! magic numbers discoverable.

use std::time::Duration;

/// SHA-256 digest of the empty input.
///
/// Zero-length files never drive the byte-counting reader, so hashing
/// short-circuits to this well-known digest instead of waiting for a read
/// loop that will never report.
pub const EMPTY_FILE_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Interval between progress reports while hashing or downloading.
pub const PROGRESS_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of concurrent hash workers.
pub const DEFAULT_HASH_CONCURRENCY: usize = 4;

/// Default number of installed versions retained after a successful update.
pub const DEFAULT_KEEP_VERSIONS: usize = 2;

/// Version label understood by the update server as "newest published".
pub const RUN_VERSION_LATEST: &str = "latest";

/// Local cache of the last successfully fetched version map, stored in the
/// install directory and read back when the server is unreachable.
pub const VERSION_MAP_CACHE_FILE: &str = "versionmap.json";

/// Persisted client identifier, generated on first run.
pub const CLIENT_ID_FILE: &str = ".clientid";

/// Maximum retry attempts for the update-check request.
pub const UPDATE_CHECK_RETRIES: usize = 2;

/// Starting delay for the update-check exponential backoff (milliseconds).
pub const UPDATE_CHECK_BACKOFF_START_MS: u64 = 250;

/// Timeout applied to every HTTP request issued by the updater.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
