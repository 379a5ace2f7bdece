//! Events delivered from a running session to its caller.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc;

use super::error::ErrorKind;
use super::progress::ProgressSample;

/// Lifecycle state of a download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Resolving URL, size, range support and filename.
    Probing,
    /// Choosing single-stream or segmented transfer.
    Planning,
    /// Transferring data.
    Fetching,
    /// Concatenating parts into the destination file.
    Merging,
    /// Destination file is complete.
    Completed,
    /// Session aborted on an error; partial output removed.
    Failed,
    /// Session stopped by the user; partial output removed.
    Cancelled,
}

impl SessionState {
    /// Returns true for `Completed`, `Failed` and `Cancelled`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Notification emitted by a session.
///
/// Exactly one of `Completed`, `Failed` or `Cancelled` is sent, and it is the
/// last event of the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DownloadEvent {
    /// The session moved to a new state.
    StateChanged {
        /// The new state.
        state: SessionState,
    },
    /// The destination filename is known.
    FilenameResolved {
        /// Filename within the destination directory.
        filename: String,
    },
    /// Throttled progress update.
    Progress(ProgressSample),
    /// The file was written successfully.
    Completed {
        /// Filename within the destination directory.
        filename: String,
        /// Full path of the written file.
        path: PathBuf,
    },
    /// The session failed; `message` includes the underlying cause.
    Failed {
        /// Classification of the failure.
        kind: ErrorKind,
        /// Human-readable description.
        message: String,
    },
    /// The user cancelled the session.
    Cancelled,
}

impl DownloadEvent {
    /// Returns true for the final event of a session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }
}

/// Sending half of a session's event channel.
///
/// Delivery is best-effort: a caller that dropped its handle simply stops
/// receiving events, the transfer itself carries on.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<DownloadEvent>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<DownloadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn send(&self, event: DownloadEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn state(&self, state: SessionState) {
        self.send(DownloadEvent::StateChanged { state });
    }
}
