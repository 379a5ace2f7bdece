//! Ordered concatenation of segment parts and removal of partial output.

use std::io::ErrorKind;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};

use super::constants::CHUNK_SIZE;
use super::error::DownloadError;
use super::planner::SegmentDescriptor;

/// Concatenates part files into `file`, the session's claimed handle for
/// `destination`, by ascending segment index, then deletes `parts_dir`.
///
/// Parts are streamed, never loaded whole. Completion order of the fetchers
/// is irrelevant; only `index` decides placement.
///
/// # Errors
///
/// Returns [`DownloadError::MergeFailed`] if the destination cannot be written
/// or a part cannot be read. Failure to delete the parts directory afterwards
/// is only logged.
#[instrument(skip(segments, file), fields(destination = %destination.display()))]
pub async fn merge_parts<'a>(
    segments: impl IntoIterator<Item = &'a SegmentDescriptor>,
    file: File,
    destination: &Path,
    parts_dir: &Path,
) -> Result<u64, DownloadError> {
    let fail = |e| DownloadError::merge_failed(destination, e);

    let mut ordered: Vec<&SegmentDescriptor> = segments.into_iter().collect();
    ordered.sort_by_key(|segment| segment.index);

    let mut writer = BufWriter::with_capacity(CHUNK_SIZE * 8, file);

    let mut total: u64 = 0;
    for segment in ordered {
        let mut part = File::open(&segment.part_path).await.map_err(fail)?;
        let copied = tokio::io::copy(&mut part, &mut writer)
            .await
            .map_err(fail)?;
        debug!(index = segment.index, bytes = copied, "appended part");
        total += copied;
    }

    writer.flush().await.map_err(fail)?;
    writer.get_ref().sync_all().await.map_err(fail)?;
    drop(writer);

    remove_dir_logged(parts_dir).await;
    info!(bytes = total, "merge complete");
    Ok(total)
}

/// Removes whatever a failed or cancelled session left on disk.
///
/// Missing paths are fine; any other error is logged and swallowed so the
/// original failure stays the one reported.
pub async fn cleanup_partial_output(destination: Option<&Path>, parts_dir: Option<&Path>) {
    if let Some(destination) = destination {
        match tokio::fs::remove_file(destination).await {
            Ok(()) => debug!(path = %destination.display(), "removed partial destination"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %destination.display(), error = %e, "failed to remove partial destination");
            }
        }
    }
    if let Some(parts_dir) = parts_dir {
        remove_dir_logged(parts_dir).await;
    }
}

async fn remove_dir_logged(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(path = %dir.display(), "removed parts directory"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove parts directory"),
    }
}
