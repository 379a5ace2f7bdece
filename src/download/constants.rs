//! Constants for the download module (timeouts, chunking, progress pacing).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds, shared by probe and segment requests).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout between body chunks (10 seconds).
pub const READ_TIMEOUT_SECS: u64 = 10;

/// Default number of parallel segment workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 64;

/// Granularity of body writes, progress updates, and cancellation checks.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Minimum wall time between two delivered progress samples.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Suffix appended to the destination filename for the temporary parts directory.
pub const PARTS_DIR_SUFFIX: &str = "_parts";
