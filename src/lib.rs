//! Segmented Downloader Core Library
//!
//! Downloads a single HTTP(S) resource to disk, splitting it into byte ranges
//! fetched in parallel when the server allows it.
//!
//! # Architecture
//!
//! - [`download`] - probe, planning, parallel fetch, merge and the session
//!   controller that ties them together
//!
//! Callers start a session with [`Downloader::start`] and observe it through
//! the returned [`SessionHandle`].

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    CancelSignal, DEFAULT_WORKERS, DownloadError, DownloadEvent, Downloader, DownloaderConfig,
    ErrorKind, HttpClient, ProgressSample, SessionHandle, SessionState,
};
