//! Segment and single-stream transfers.
//!
//! Bodies are streamed to disk in [`CHUNK_SIZE`] pieces. After every piece the
//! byte counters are bumped and the stop signals are checked, so cancellation
//! takes effect within one chunk of I/O.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::cancel::StopSignals;
use super::client::HttpClient;
use super::constants::CHUNK_SIZE;
use super::error::{DownloadError, TransferError};
use super::planner::SegmentDescriptor;
use super::progress::ProgressAggregator;

/// How a fetch ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The whole body was written and flushed.
    Completed {
        /// Bytes written.
        bytes: u64,
    },
    /// A stop signal was observed; the output is incomplete.
    Stopped,
}

/// Downloads one segment with a ranged GET into its part file.
///
/// # Errors
///
/// Returns [`DownloadError::SegmentFailed`] carrying the segment index for any
/// transport, status, disk or length mismatch failure.
#[instrument(skip_all, fields(index = segment.index, start = segment.start, end = segment.end))]
pub async fn fetch_segment(
    client: &HttpClient,
    url: &str,
    segment: &SegmentDescriptor,
    stop: &StopSignals,
    progress: &ProgressAggregator,
) -> Result<FetchOutcome, DownloadError> {
    let fail = |e| DownloadError::segment_failed(segment.index, e);
    let expected = segment.len();

    let response = client
        .get_range(url, segment.start, segment.end)
        .await
        .map_err(fail)?;

    // A server that ignores Range answers 200 with the full body.
    if response.status() != StatusCode::PARTIAL_CONTENT
        && let Some(length) = response.content_length()
        && length != expected
    {
        return Err(fail(TransferError::integrity(
            &segment.part_path,
            expected,
            length,
        )));
    }

    let file = File::create(&segment.part_path)
        .await
        .map_err(|e| fail(TransferError::io(&segment.part_path, e)))?;

    let outcome = stream_body(
        response,
        file,
        url,
        &segment.part_path,
        Some(expected),
        stop,
        |n| {
            segment.add_transferred(n);
            progress.record(n);
        },
    )
    .await
    .map_err(fail)?;

    if let FetchOutcome::Completed { bytes } = outcome
        && bytes != expected
    {
        return Err(fail(TransferError::integrity(
            &segment.part_path,
            expected,
            bytes,
        )));
    }

    debug!(?outcome, "segment finished");
    Ok(outcome)
}

/// Downloads the whole resource with one plain GET into `file`, the
/// already-claimed handle for `destination`.
///
/// # Errors
///
/// Returns [`DownloadError::SegmentFailed`] with index 0 on any failure.
#[instrument(skip_all, fields(destination = %destination.display()))]
pub async fn fetch_single(
    client: &HttpClient,
    url: &str,
    file: File,
    destination: &Path,
    stop: &StopSignals,
    progress: &ProgressAggregator,
) -> Result<FetchOutcome, DownloadError> {
    let fail = |e| DownloadError::segment_failed(0, e);

    let response = client.get(url).await.map_err(fail)?;

    let outcome = stream_body(response, file, url, destination, None, stop, |n| {
        progress.record(n);
    })
    .await
    .map_err(fail)?;

    debug!(?outcome, "single stream finished");
    Ok(outcome)
}

/// Streams a response body into `file`, returning bytes written.
///
/// With `limit` set, a body longer than the limit is rejected as soon as it
/// overflows instead of after the fact.
async fn stream_body(
    response: reqwest::Response,
    file: File,
    url: &str,
    file_path: &Path,
    limit: Option<u64>,
    stop: &StopSignals,
    mut on_chunk: impl FnMut(u64),
) -> Result<FetchOutcome, TransferError> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| TransferError::from_reqwest(url, e))?;

        for piece in chunk.chunks(CHUNK_SIZE) {
            if stop.should_stop() {
                // Buffered bytes are dropped on purpose: a stopped part must
                // never look complete.
                debug!(bytes_written, "stop observed, abandoning transfer");
                return Ok(FetchOutcome::Stopped);
            }

            let len = piece.len() as u64;
            if let Some(limit) = limit
                && bytes_written + len > limit
            {
                return Err(TransferError::integrity(
                    file_path,
                    limit,
                    bytes_written + len,
                ));
            }

            writer
                .write_all(piece)
                .await
                .map_err(|e| TransferError::io(file_path, e))?;
            bytes_written += len;
            on_chunk(len);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(file_path, e))?;

    Ok(FetchOutcome::Completed {
        bytes: bytes_written,
    })
}
