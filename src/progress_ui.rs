//! Terminal progress bar driven by session events.

use downloader_core::{DownloadEvent, SessionState};
use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{prefix} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner} {prefix} {bytes} {msg}";

/// Renders one session onto a single indicatif bar.
///
/// Starts as a spinner and switches to a bar once a sample with a known
/// total size arrives.
pub(crate) struct ProgressUi {
    bar: ProgressBar,
    sized: bool,
}

impl ProgressUi {
    /// Creates the UI; when `enabled` is false nothing is drawn.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar, sized: false }
    }

    pub(crate) fn handle(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::StateChanged { state } => match state {
                SessionState::Probing => self.bar.set_message("probing"),
                SessionState::Merging => self.bar.set_message("merging parts"),
                _ => {}
            },
            DownloadEvent::FilenameResolved { filename } => {
                self.bar.set_prefix(filename.clone());
            }
            DownloadEvent::Progress(sample) => {
                if sample.total_size > 0 && !self.sized {
                    self.bar.set_length(sample.total_size);
                    self.bar.set_style(
                        ProgressStyle::with_template(BAR_TEMPLATE)
                            .unwrap_or_else(|_| ProgressStyle::default_bar()),
                    );
                    self.sized = true;
                }
                self.bar.set_position(sample.bytes_transferred);
                self.bar.set_message(format!(
                    "{} eta {}",
                    sample.throughput_text(),
                    sample.eta_text()
                ));
            }
            DownloadEvent::Completed { .. }
            | DownloadEvent::Failed { .. }
            | DownloadEvent::Cancelled => self.bar.finish_and_clear(),
        }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}
