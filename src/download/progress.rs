//! Progress aggregation across concurrently running fetchers.
//!
//! All fetchers add to one shared counter. Samples are computed from that
//! counter and the session start time, and delivered at most once per
//! interval; the 100% sample bypasses the throttle.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::events::{DownloadEvent, EventSender};

/// Snapshot of transfer progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSample {
    /// Fraction complete in `[0, 1]`; stays 0 while the size is unknown.
    pub fraction: f64,
    /// Bytes written so far.
    pub bytes_transferred: u64,
    /// Total size in bytes, 0 when unknown.
    pub total_size: u64,
    /// Average throughput since the session started.
    pub bytes_per_second: f64,
    /// Estimated seconds remaining, `None` when unknown.
    pub eta_secs: Option<u64>,
}

impl ProgressSample {
    /// Computes a sample from the running total and elapsed time.
    ///
    /// Throughput is a plain running average. ETA is unknown when the total
    /// size is unknown or nothing has been transferred yet.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn compute(bytes_transferred: u64, total_size: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let bytes_per_second = if secs > 0.0 {
            bytes_transferred as f64 / secs
        } else {
            0.0
        };
        let fraction = if total_size > 0 {
            (bytes_transferred as f64 / total_size as f64).min(1.0)
        } else {
            0.0
        };
        let eta_secs = (total_size > 0 && bytes_per_second > 0.0).then(|| {
            let remaining = total_size.saturating_sub(bytes_transferred);
            (remaining as f64 / bytes_per_second) as u64
        });

        Self {
            fraction,
            bytes_transferred,
            total_size,
            bytes_per_second,
            eta_secs,
        }
    }

    /// Estimated time remaining.
    #[must_use]
    pub fn eta(&self) -> Option<Duration> {
        self.eta_secs.map(Duration::from_secs)
    }

    /// Throughput as `"x.xx MiB/s"`.
    #[must_use]
    pub fn throughput_text(&self) -> String {
        format!("{:.2} MiB/s", self.bytes_per_second / 1024.0 / 1024.0)
    }

    /// ETA as `"Ns"`, or `"unknown"`.
    #[must_use]
    pub fn eta_text(&self) -> String {
        self.eta_secs
            .map_or_else(|| "unknown".to_string(), |secs| format!("{secs}s"))
    }
}

/// Rate limiter for sample delivery.
#[derive(Debug)]
struct Throttle {
    interval: Duration,
    last: Option<Instant>,
    final_sent: bool,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            final_sent: false,
        }
    }

    /// Decides whether a sample taken at `now` is delivered.
    fn admit(&mut self, now: Instant, is_final: bool) -> bool {
        if self.final_sent {
            return false;
        }
        if is_final {
            self.final_sent = true;
            self.last = Some(now);
            return true;
        }
        let due = self
            .last
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

/// Shared byte counter plus throttled sample delivery for one session.
#[derive(Debug)]
pub struct ProgressAggregator {
    total_size: u64,
    started: Instant,
    transferred: AtomicU64,
    throttle: Mutex<Throttle>,
    events: EventSender,
}

impl ProgressAggregator {
    pub(crate) fn new(total_size: u64, interval: Duration, events: EventSender) -> Self {
        Self {
            total_size,
            started: Instant::now(),
            transferred: AtomicU64::new(0),
            throttle: Mutex::new(Throttle::new(interval)),
            events,
        }
    }

    /// Total bytes recorded so far.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Acquire)
    }

    /// Adds `bytes` to the shared counter and emits a sample if one is due.
    ///
    /// The counter never decreases and, with a known size, never exceeds it.
    pub fn record(&self, bytes: u64) {
        let total_size = self.total_size;
        let previous = self
            .transferred
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.saturating_add(bytes);
                Some(if total_size > 0 {
                    next.min(total_size)
                } else {
                    next
                })
            })
            .unwrap_or_else(|current| current);
        let updated = if total_size > 0 {
            previous.saturating_add(bytes).min(total_size)
        } else {
            previous.saturating_add(bytes)
        };
        self.emit(total_size > 0 && updated == total_size);
    }

    /// Emits the final 100% sample unless it was already delivered.
    pub fn finish(&self) {
        self.emit(true);
    }

    fn emit(&self, is_final: bool) {
        let mut throttle = self
            .throttle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !throttle.admit(Instant::now(), is_final) {
            return;
        }
        // Read under the lock so delivered samples are monotonic.
        let mut sample = ProgressSample::compute(
            self.transferred(),
            self.total_size,
            self.started.elapsed(),
        );
        if is_final {
            sample.fraction = 1.0;
        }
        self.events.send(DownloadEvent::Progress(sample));
    }
}
