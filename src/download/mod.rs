//! Segmented HTTP download engine.
//!
//! A session probes the resource, splits it into byte ranges when the server
//! supports that, fetches the ranges concurrently into part files, and merges
//! them into one destination file. Servers without range support or without a
//! known size get a single streaming GET instead.
//!
//! # Features
//!
//! - HEAD probe with GET fallback; redirects resolved once, up front
//! - Parallel ranged GETs, one worker per segment (8 by default)
//! - Throttled progress with throughput and ETA
//! - Cooperative cancellation; partial output is always removed
//! - Filenames from Content-Disposition or the URL path, never overwriting
//!
//! # Example
//!
//! ```no_run
//! use downloader_core::download::{Downloader, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(DownloaderConfig::default())?;
//! let session = downloader.start("https://example.com/dataset.tar", "./downloads");
//! let path = session.wait().await?;
//! println!("Downloaded: {}", path.display());
//! # Ok(())
//! # }
//! ```

mod cancel;
mod client;
mod constants;
mod error;
mod events;
mod fetcher;
mod filename;
mod merge;
mod planner;
mod probe;
mod progress;
mod session;

pub use cancel::CancelSignal;
pub use client::HttpClient;
pub use constants::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
pub use error::{DownloadError, ErrorKind, TransferError};
pub use events::{DownloadEvent, SessionState};
pub use planner::{SegmentDescriptor, SegmentPlan, plan, plan_for};
pub use probe::{ResourceInfo, probe};
pub use progress::ProgressSample;
pub use session::{ConfigError, Downloader, DownloaderConfig, SessionHandle};

// No module-local Result aliases; signatures spell out `Result<T, DownloadError>`.
