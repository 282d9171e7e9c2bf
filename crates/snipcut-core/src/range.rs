// crates/snipcut-core/src/range.rs
//
// RangeSelector: decides which slider handle moved and where the preview
// should seek. Pure state machine; the editor does the labelling and hands
// `seek_target` to the debouncer.

use crate::state::Selection;

/// How far before the end handle the preview seeks when the end moved, so the
/// frame shown lies inside the selection rather than on its boundary.
pub const END_BACKOFF_SECS: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeUpdate {
    pub changed_to_start: bool,
    pub video_start:      f64,
    pub video_end:        f64,
    pub seek_target:      f64,
}

#[derive(Debug)]
pub struct RangeSelector {
    last: Selection,
}

impl RangeSelector {
    pub fn new() -> Self {
        Self { last: Selection::FULL }
    }

    /// The most recently committed selection.
    pub fn last(&self) -> Selection { self.last }

    /// Commit `values` for a clip of `duration` seconds.
    ///
    /// A start handle sitting at the origin counts as "moved" even when it did
    /// not change, so dragging the left handle against the boundary keeps
    /// previewing the first frame.
    pub fn update(&mut self, values: Selection, duration: f64) -> RangeUpdate {
        let changed_to_start = values.start() != self.last.start() || values.start() == 0.0;
        let (video_start, video_end) = values.to_seconds(duration);

        self.last = values;

        let seek_target = if changed_to_start {
            video_start
        } else {
            (video_end - END_BACKOFF_SECS).max(video_start)
        };

        RangeUpdate { changed_to_start, video_start, video_end, seek_target }
    }
}

impl Default for RangeSelector {
    fn default() -> Self { Self::new() }
}
