//! Session controller: probe, plan, fetch, merge, and clean up.
//!
//! Each call to [`Downloader::start`] spawns one background task that owns the
//! whole session. The caller talks to it only through the returned
//! [`SessionHandle`]: an event stream, a cancel switch, and the final result.
//!
//! # Example
//!
//! ```no_run
//! use downloader_core::download::{DownloadEvent, Downloader, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(DownloaderConfig::default())?;
//! let mut session = downloader.start("https://example.com/big.iso", "./downloads");
//! while let Some(event) = session.next_event().await {
//!     if let DownloadEvent::Progress(sample) = &event {
//!         println!("{:.0}% {} eta {}", sample.fraction * 100.0, sample.throughput_text(), sample.eta_text());
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//! let path = session.wait().await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use super::cancel::{CancelSignal, StopSignals};
use super::client::HttpClient;
use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS, PROGRESS_INTERVAL,
    READ_TIMEOUT_SECS,
};
use super::error::{DownloadError, TransferError};
use super::events::{DownloadEvent, EventSender, SessionState};
use super::fetcher::{FetchOutcome, fetch_segment, fetch_single};
use super::filename::{claim_unique_path, parts_dir_for};
use super::merge::{cleanup_partial_output, merge_parts};
use super::planner::{SegmentDescriptor, SegmentPlan, plan_for};
use super::probe::probe;
use super::progress::ProgressAggregator;

/// Error type for downloader construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid worker count provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers {
        /// The invalid value that was provided.
        value: usize,
    },

    /// A timeout of zero was provided.
    #[error("invalid {name}: must be greater than zero")]
    InvalidTimeout {
        /// Which timeout was rejected.
        name: &'static str,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Tunables for a [`Downloader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Parallel segment workers, and the number of segments planned.
    pub workers: usize,
    /// Connect timeout for probe and segment requests.
    pub connect_timeout: Duration,
    /// Idle read timeout for probe and segment requests.
    pub read_timeout: Duration,
    /// Minimum spacing between delivered progress samples.
    pub progress_interval: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl DownloaderConfig {
    /// Checks values against supported ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorkers`] or [`ConfigError::InvalidTimeout`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(ConfigError::InvalidWorkers {
                value: self.workers,
            });
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                name: "connect timeout",
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout {
                name: "read timeout",
            });
        }
        Ok(())
    }
}

/// Entry point for starting download sessions.
///
/// Holds one pooled HTTP client; every session started from the same
/// downloader shares its connections.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: HttpClient,
    config: DownloaderConfig,
}

impl Downloader {
    /// Creates a downloader after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for out-of-range settings or if the HTTP client
    /// cannot be built.
    #[instrument(level = "debug")]
    pub fn new(config: DownloaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = HttpClient::with_timeouts(config.connect_timeout, config.read_timeout)?;
        debug!(
            workers = config.workers,
            connect_timeout_ms = config.connect_timeout.as_millis(),
            read_timeout_ms = config.read_timeout.as_millis(),
            "creating downloader"
        );
        Ok(Self { client, config })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Starts downloading `url` into `destination_dir` on a background task.
    ///
    /// Returns immediately; progress and the outcome arrive through the handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use = "dropping the handle loses the session outcome"]
    pub fn start(&self, url: impl Into<String>, destination_dir: impl Into<PathBuf>) -> SessionHandle {
        let cancel = CancelSignal::new();
        let (events, rx) = EventSender::channel();
        let session = DownloadSession {
            client: self.client.clone(),
            config: self.config.clone(),
            source_url: url.into(),
            destination_dir: destination_dir.into(),
            stop: StopSignals::new(cancel.clone()),
            events,
            destination: None,
            parts_dir: None,
        };
        let task = tokio::spawn(session.run());
        SessionHandle {
            cancel,
            events: rx,
            task,
        }
    }
}

/// Caller's view of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancelSignal,
    events: mpsc::UnboundedReceiver<DownloadEvent>,
    task: JoinHandle<Result<PathBuf, DownloadError>>,
}

impl SessionHandle {
    /// Requests cooperative cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns a cloneable cancel switch, e.g. for a signal handler.
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Receives the next event; `None` once the session has ended and all
    /// events were consumed.
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events.recv().await
    }

    /// Waits for the session to end and returns the destination path.
    ///
    /// # Errors
    ///
    /// Returns the session's [`DownloadError`]; [`DownloadError::Cancelled`]
    /// when the user cancelled.
    pub async fn wait(self) -> Result<PathBuf, DownloadError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(_) => Err(DownloadError::Cancelled),
        }
    }
}

/// State of one transfer, owned by its background task.
struct DownloadSession {
    client: HttpClient,
    config: DownloaderConfig,
    source_url: String,
    destination_dir: PathBuf,
    stop: StopSignals,
    events: EventSender,
    // Recorded as soon as they are chosen so cleanup knows what to remove.
    destination: Option<PathBuf>,
    parts_dir: Option<PathBuf>,
}

impl DownloadSession {
    #[instrument(skip(self), fields(url = %self.source_url))]
    async fn run(mut self) -> Result<PathBuf, DownloadError> {
        let result = self.execute().await;

        match &result {
            Ok(path) => {
                let filename = display_name(path);
                info!(path = %path.display(), "download completed");
                self.events.state(SessionState::Completed);
                self.events.send(DownloadEvent::Completed {
                    filename,
                    path: path.clone(),
                });
            }
            Err(error) => {
                cleanup_partial_output(self.destination.as_deref(), self.parts_dir.as_deref())
                    .await;
                if error.is_cancelled() {
                    info!("download cancelled");
                    self.events.state(SessionState::Cancelled);
                    self.events.send(DownloadEvent::Cancelled);
                } else {
                    warn!(error = %error, "download failed");
                    self.events.state(SessionState::Failed);
                    self.events.send(DownloadEvent::Failed {
                        kind: error.kind(),
                        message: error.to_string(),
                    });
                }
            }
        }

        result
    }

    async fn execute(&mut self) -> Result<PathBuf, DownloadError> {
        self.events.state(SessionState::Probing);
        let info = probe(&self.client, &self.source_url).await?;
        self.ensure_not_cancelled()?;

        self.events.state(SessionState::Planning);
        tokio::fs::create_dir_all(&self.destination_dir)
            .await
            .map_err(|e| DownloadError::storage(&self.destination_dir, e))?;
        let claimed = claim_unique_path(
            &self.destination_dir,
            &info.filename,
            info.is_segmentable(),
        )
        .await
        .map_err(|e| DownloadError::storage(&self.destination_dir, e))?;
        let destination = claimed.path;
        self.destination = Some(destination.clone());
        self.parts_dir.clone_from(&claimed.parts_dir);
        self.events.send(DownloadEvent::FilenameResolved {
            filename: display_name(&destination),
        });

        let parts_dir = parts_dir_for(&destination);
        let plan = plan_for(&info, self.config.workers, &parts_dir);
        let progress = Arc::new(ProgressAggregator::new(
            info.total_size,
            self.config.progress_interval,
            self.events.clone(),
        ));
        let resolved_url = info.resolved_url.to_string();
        self.ensure_not_cancelled()?;

        self.events.state(SessionState::Fetching);
        match plan {
            SegmentPlan::SingleStream => {
                debug!("using single-stream transfer");
                let outcome = fetch_single(
                    &self.client,
                    &resolved_url,
                    claimed.file,
                    &destination,
                    &self.stop,
                    &progress,
                )
                .await?;
                if outcome == FetchOutcome::Stopped {
                    return Err(DownloadError::Cancelled);
                }
                self.ensure_not_cancelled()?;
            }
            SegmentPlan::Segmented(segments) => {
                debug!(segments = segments.len(), "using segmented transfer");
                let segments = self
                    .fetch_segments(&resolved_url, segments, &progress)
                    .await?;
                self.ensure_not_cancelled()?;

                self.events.state(SessionState::Merging);
                merge_parts(
                    segments.iter().map(|segment| &**segment),
                    claimed.file,
                    &destination,
                    &parts_dir,
                )
                .await?;
            }
        }

        progress.finish();
        Ok(destination)
    }

    /// Runs one fetcher task per segment and waits for all of them.
    ///
    /// The first failure raises the abort flag and tears the remaining tasks
    /// down; so does a user cancellation.
    async fn fetch_segments(
        &self,
        url: &str,
        segments: Vec<SegmentDescriptor>,
        progress: &Arc<ProgressAggregator>,
    ) -> Result<Vec<Arc<SegmentDescriptor>>, DownloadError> {
        let segments: Vec<Arc<SegmentDescriptor>> = segments.into_iter().map(Arc::new).collect();
        let url: Arc<str> = Arc::from(url);

        let mut tasks = JoinSet::new();
        let mut task_segments = HashMap::new();
        for segment in &segments {
            let client = self.client.clone();
            let url = Arc::clone(&url);
            let task_segment = Arc::clone(segment);
            let stop = self.stop.clone();
            let progress = Arc::clone(progress);
            let handle = tasks.spawn(async move {
                fetch_segment(&client, &url, &task_segment, &stop, &progress).await
            });
            task_segments.insert(handle.id(), Arc::clone(segment));
        }

        let mut failure: Option<DownloadError> = None;
        let mut stopped = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(FetchOutcome::Completed { bytes })) => {
                    debug!(bytes, remaining = tasks.len(), "segment completed");
                }
                Ok(Ok(FetchOutcome::Stopped)) => stopped = true,
                Ok(Err(error)) => failure = Some(error),
                Err(join_error) => {
                    let (index, path) = task_segments
                        .get(&join_error.id())
                        .map_or((0, PathBuf::new()), |s| (s.index, s.part_path.clone()));
                    failure = Some(DownloadError::segment_failed(
                        index,
                        TransferError::io(path, std::io::Error::other(join_error)),
                    ));
                }
            }

            if failure.is_some() || stopped || self.stop.user.is_cancelled() {
                self.stop.abort.cancel();
                tasks.shutdown().await;
                break;
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        if stopped || self.stop.user.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        Ok(segments)
    }

    fn ensure_not_cancelled(&self) -> Result<(), DownloadError> {
        if self.stop.user.is_cancelled() {
            Err(DownloadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DownloaderConfig::default();
        assert_eq!(config.workers, 8);
        assert_eq!(config.progress_interval, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_workers() {
        let config = DownloaderConfig {
            workers: 0,
            ..DownloaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkers { value: 0 })
        ));
    }

    #[test]
    fn test_config_rejects_too_many_workers() {
        let config = DownloaderConfig {
            workers: MAX_WORKERS + 1,
            ..DownloaderConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid worker count"));
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let config = DownloaderConfig {
            read_timeout: Duration::ZERO,
            ..DownloaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout {
                name: "read timeout"
            })
        ));
    }

    #[test]
    fn test_downloader_new_keeps_config() {
        let config = DownloaderConfig {
            workers: 4,
            ..DownloaderConfig::default()
        };
        let downloader = Downloader::new(config.clone()).unwrap();
        assert_eq!(downloader.config(), &config);
    }

    #[tokio::test]
    async fn test_invalid_url_fails_with_single_terminal_event() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let downloader = Downloader::new(DownloaderConfig::default()).unwrap();
        let mut session = downloader.start("::not a url::", temp_dir.path());

        let mut events = Vec::new();
        while let Some(event) = session.next_event().await {
            events.push(event);
        }
        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(
            events.last(),
            Some(DownloadEvent::Failed {
                kind: crate::download::ErrorKind::ProbeFailed,
                ..
            })
        ));

        let err = session.wait().await.unwrap_err();
        assert!(matches!(err, DownloadError::ProbeFailed { .. }));
    }
}
