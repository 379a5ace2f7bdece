//! Segment planning: split `[0, total_size)` into contiguous byte ranges.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::probe::ResourceInfo;

/// One contiguous byte range of the resource and the part file that receives it.
///
/// The byte counter is written only by the fetcher that owns the segment and
/// read by progress reporting.
#[derive(Debug)]
pub struct SegmentDescriptor {
    /// Ordinal position; the authoritative merge order.
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    /// Temporary part file for this segment.
    pub part_path: PathBuf,
    transferred: AtomicU64,
}

// A segment always covers at least one byte, so there is no `is_empty`.
#[allow(clippy::len_without_is_empty)]
impl SegmentDescriptor {
    /// Creates a descriptor for `start..=end`.
    #[must_use]
    pub fn new(index: usize, start: u64, end: u64, part_path: PathBuf) -> Self {
        Self {
            index,
            start,
            end,
            part_path,
            transferred: AtomicU64::new(0),
        }
    }

    /// Number of bytes this segment covers.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Bytes written to the part file so far.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.transferred.load(Ordering::Acquire)
    }

    pub(crate) fn add_transferred(&self, bytes: u64) {
        self.transferred.fetch_add(bytes, Ordering::AcqRel);
    }
}

/// Transfer strategy chosen for a resource.
#[derive(Debug)]
pub enum SegmentPlan {
    /// Stream the whole body with one plain GET.
    SingleStream,
    /// Fetch these ranged segments in parallel and merge them.
    Segmented(Vec<SegmentDescriptor>),
}

/// Chooses a strategy for `info`, placing part files under `parts_dir`.
#[must_use]
pub fn plan_for(info: &ResourceInfo, workers: usize, parts_dir: &Path) -> SegmentPlan {
    if !info.is_segmentable() {
        return SegmentPlan::SingleStream;
    }
    SegmentPlan::Segmented(plan(info.total_size, workers, parts_dir))
}

/// Partitions `[0, total_size - 1]` into at most `workers` segments.
///
/// Every segment gets `total_size / workers` bytes and the last one absorbs
/// the remainder. The worker count is clamped to `1..=total_size` so no
/// segment is empty. Returns an empty list for `total_size == 0`.
#[must_use]
pub fn plan(total_size: u64, workers: usize, parts_dir: &Path) -> Vec<SegmentDescriptor> {
    if total_size == 0 {
        return Vec::new();
    }
    let count = u64::try_from(workers.max(1))
        .unwrap_or(u64::MAX)
        .min(total_size);
    let chunk = total_size / count;

    (0..count)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == count {
                total_size - 1
            } else {
                (i + 1) * chunk - 1
            };
            // count <= workers, so the index always fits in usize.
            let index = usize::try_from(i).unwrap_or(usize::MAX);
            SegmentDescriptor::new(index, start, end, parts_dir.join(format!("part_{index}")))
        })
        .collect()
}
