//! Error types for the download module.
//!
//! [`TransferError`] describes what went wrong on the wire or on disk.
//! [`DownloadError`] is the session-level outcome a caller sees, carrying the
//! transfer error as its cause where one exists.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Low-level failure of a single HTTP exchange or file write.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Network-level error (DNS resolution, connection refused, reset, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request or body read timed out.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while writing a part or the destination.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Received body length does not match the requested byte range.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// File that received the mismatched body.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },
}

impl TransferError {
    /// Classifies a reqwest error as a timeout or a generic network error.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }
}

/// Fieldless classification of a [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Both the metadata probe and the streaming fallback failed.
    ProbeFailed,
    /// Neither Content-Disposition nor the URL yielded a filename.
    UnresolvedFilename,
    /// A segment (or the single stream) failed to transfer.
    SegmentFailed,
    /// Concatenating parts into the destination failed.
    MergeFailed,
    /// Destination or parts directory could not be prepared.
    Storage,
    /// The user cancelled the session.
    Cancelled,
}

/// Terminal outcome of a download session other than success.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Resource metadata could not be fetched with HEAD or GET.
    #[error("probe failed for {url}: {source}")]
    ProbeFailed {
        /// The URL that was probed.
        url: String,
        /// Failure of the last probe attempt.
        #[source]
        source: TransferError,
    },

    /// No usable filename could be derived from the response.
    #[error("could not resolve a filename for {url}")]
    UnresolvedFilename {
        /// The resolved URL after redirects.
        url: String,
    },

    /// One segment failed; the whole session is aborted.
    #[error("segment {index} failed: {source}")]
    SegmentFailed {
        /// Ordinal index of the failed segment (0 for single-stream transfers).
        index: usize,
        /// The underlying transfer failure.
        #[source]
        source: TransferError,
    },

    /// Parts could not be concatenated into the destination file.
    #[error("merge into {path} failed: {source}")]
    MergeFailed {
        /// Destination path being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Destination directory or parts directory could not be created.
    #[error("cannot prepare {path}: {source}")]
    Storage {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The session was cancelled by the user.
    #[error("download cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Creates a probe failure.
    pub fn probe_failed(url: impl Into<String>, source: TransferError) -> Self {
        Self::ProbeFailed {
            url: url.into(),
            source,
        }
    }

    /// Creates an unresolved-filename failure.
    pub fn unresolved_filename(url: impl Into<String>) -> Self {
        Self::UnresolvedFilename { url: url.into() }
    }

    /// Creates a segment failure.
    #[must_use]
    pub fn segment_failed(index: usize, source: TransferError) -> Self {
        Self::SegmentFailed { index, source }
    }

    /// Creates a merge failure.
    pub fn merge_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::MergeFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates a storage preparation failure.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProbeFailed { .. } => ErrorKind::ProbeFailed,
            Self::UnresolvedFilename { .. } => ErrorKind::UnresolvedFilename,
            Self::SegmentFailed { .. } => ErrorKind::SegmentFailed,
            Self::MergeFailed { .. } => ErrorKind::MergeFailed,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns true when the session ended because the user cancelled it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs a url,
// path, or segment index the source error does not carry.
