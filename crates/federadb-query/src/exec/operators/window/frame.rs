//! Frame resolution.

use std::ops::Range;

use crate::plan::logical::{FrameBound, FrameMode, WindowSpecification};

use super::partition::Partition;

fn offset(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Returns the positions of the frame for the row at `pos`, clipped to
/// the partition. The range is empty when the frame holds no rows.
///
/// Without an explicit frame the window runs from the partition start to
/// the end of the current peer group when there is an ORDER BY, and covers
/// the whole partition otherwise.
pub(crate) fn frame_range(spec: &WindowSpecification, partition: &Partition, pos: usize) -> Range<usize> {
    let len = partition.len();
    let Some(frame) = &spec.frame else {
        return if spec.has_order_by() { 0..partition.peers(pos).end } else { 0..len };
    };

    let (start, end) = match frame.mode {
        FrameMode::Rows => {
            let start = match frame.start {
                FrameBound::UnboundedPreceding => 0,
                FrameBound::Preceding(n) => pos.saturating_sub(offset(n)),
                FrameBound::CurrentRow => pos,
                FrameBound::Following(n) => pos.saturating_add(offset(n)),
                FrameBound::UnboundedFollowing => len,
            };
            let end = match frame.end_bound() {
                FrameBound::UnboundedPreceding => 0,
                FrameBound::Preceding(n) => (pos + 1).saturating_sub(offset(n)),
                FrameBound::CurrentRow => pos + 1,
                FrameBound::Following(n) => pos.saturating_add(offset(n)).saturating_add(1),
                FrameBound::UnboundedFollowing => len,
            };
            (start, end)
        }
        // RANGE bounds are UNBOUNDED or CURRENT ROW; CURRENT ROW means the peer group.
        FrameMode::Range => {
            let peers = partition.peers(pos);
            let start = match frame.start {
                FrameBound::UnboundedPreceding => 0,
                FrameBound::UnboundedFollowing => len,
                _ => peers.start,
            };
            let end = match frame.end_bound() {
                FrameBound::UnboundedFollowing => len,
                FrameBound::UnboundedPreceding => 0,
                _ => peers.end,
            };
            (start, end)
        }
    };

    let end = end.min(len);
    start.min(end)..end
}

/// Returns true if the frame always starts at the partition start, so its
/// end only moves forward and an aggregate can be accumulated incrementally.
pub(crate) fn starts_at_partition_start(spec: &WindowSpecification) -> bool {
    spec.frame.as_ref().map_or(true, |frame| frame.start == FrameBound::UnboundedPreceding)
}
