//! Windowed sequence viewport
//!
//! Maps an arbitrarily long ordered sequence onto a viewport of fixed
//! extent. Item extents start as an estimate and are corrected as items are
//! measured; a Fenwick tree keeps offset lookups logarithmic so sequences of
//! 10^4..10^5 items are never scanned linearly.
//!
//! Extents and offsets are integer units (rows or pixels).

use super::fenwick::FenwickTree;

pub const DEFAULT_OVERSCAN: usize = 5;
pub const DEFAULT_ESTIMATED_EXTENT: u32 = 24;

/// Inclusive index range to materialise, overscan included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub first: usize,
    pub last: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Snapshot of the inputs that determine the visible range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub total_count: usize,
    pub viewport_extent: u32,
    pub scroll_offset: u64,
}

#[derive(Debug, Clone)]
pub struct SequenceViewport {
    extents: FenwickTree,
    measured: Vec<bool>,
    estimated_extent: u32,
    viewport_extent: u32,
    scroll_offset: u64,
    overscan: usize,
    /// Keep the tail in view as items are appended.
    follow: bool,
}

impl Default for SequenceViewport {
    fn default() -> Self {
        Self::new(DEFAULT_ESTIMATED_EXTENT)
    }
}

impl SequenceViewport {
    pub fn new(estimated_extent: u32) -> Self {
        Self {
            extents: FenwickTree::new(),
            measured: vec![],
            estimated_extent,
            viewport_extent: 0,
            scroll_offset: 0,
            overscan: DEFAULT_OVERSCAN,
            follow: false,
        }
    }

    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    #[must_use]
    pub fn with_viewport_extent(mut self, extent: u32) -> Self {
        self.set_viewport_extent(extent);
        self
    }

    #[must_use]
    pub fn with_follow(mut self, follow: bool) -> Self {
        self.set_follow(follow);
        self
    }

    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn viewport_extent(&self) -> u32 {
        self.viewport_extent
    }

    pub fn follow_mode(&self) -> bool {
        self.follow
    }

    pub fn state(&self) -> WindowState {
        WindowState {
            total_count: self.len(),
            viewport_extent: self.viewport_extent,
            scroll_offset: self.scroll_offset,
        }
    }

    pub fn total_extent(&self) -> u64 {
        self.extents.total()
    }

    pub fn max_scroll_offset(&self) -> u64 {
        self.total_extent()
            .saturating_sub(u64::from(self.viewport_extent))
    }

    /// Offset of the leading edge of item `index`.
    pub fn item_offset(&self, index: usize) -> u64 {
        self.extents.prefix(index)
    }

    pub fn item_extent(&self, index: usize) -> Option<u32> {
        self.extents.get(index)
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    /// Appends one item at the estimated extent.
    pub fn push(&mut self) {
        self.extend(1);
    }

    /// Appends `count` items at the estimated extent.
    pub fn extend(&mut self, count: usize) {
        for _ in 0..count {
            self.extents.push(self.estimated_extent);
            self.measured.push(false);
        }
        if self.follow {
            self.scroll_offset = self.max_scroll_offset();
        }
    }

    /// Appends one item whose extent is already known.
    pub fn push_measured(&mut self, extent: u32) {
        self.extents.push(extent);
        self.measured.push(true);
        if self.follow {
            self.scroll_offset = self.max_scroll_offset();
        }
    }

    /// Grows or shrinks the sequence. Shrinking re-clamps the scroll offset
    /// so the window never points past the end.
    pub fn set_total_count(&mut self, count: usize) {
        let len = self.len();
        if count > len {
            self.extend(count - len);
        } else if count < len {
            self.extents.truncate(count);
            self.measured.truncate(count);
            self.clamp_scroll();
            if self.follow {
                self.scroll_offset = self.max_scroll_offset();
            }
        }
    }

    pub fn clear(&mut self) {
        self.set_total_count(0);
    }

    /// Records the observed extent of item `index`, replacing the estimate.
    pub fn update_measured_extent(&mut self, index: usize, observed: u32) {
        if index >= self.len() {
            return;
        }
        self.extents.set(index, observed);
        self.measured[index] = true;
        if self.follow {
            self.scroll_offset = self.max_scroll_offset();
        } else {
            self.clamp_scroll();
        }
    }

    pub fn set_viewport_extent(&mut self, extent: u32) {
        self.viewport_extent = extent;
        if self.follow {
            self.scroll_offset = self.max_scroll_offset();
        } else {
            self.clamp_scroll();
        }
    }

    /// Absolute scroll. Scrolling away from the tail leaves follow mode.
    pub fn scroll_to(&mut self, offset: u64) {
        self.scroll_offset = offset.min(self.max_scroll_offset());
        if self.scroll_offset < self.max_scroll_offset() {
            self.follow = false;
        }
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta.is_negative() {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta.unsigned_abs())
        };
        self.scroll_to(target);
    }

    /// Brings the leading edge of `index` to the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        self.scroll_to(self.item_offset(index));
    }

    pub fn scroll_to_start(&mut self) {
        self.scroll_to(0);
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll_offset = self.max_scroll_offset();
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-i64::from(self.viewport_extent));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(i64::from(self.viewport_extent));
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        if follow {
            self.scroll_to_end();
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.scroll_offset >= self.max_scroll_offset()
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
    }

    /// Index of the item covering `offset`, clamped to the last item.
    fn index_at(&self, offset: u64) -> usize {
        self.extents
            .count_within(offset)
            .min(self.len().saturating_sub(1))
    }

    /// Items intersecting `[scroll_offset, scroll_offset + viewport_extent)`
    /// without overscan. `None` for an empty sequence.
    pub fn visible_items(&self) -> Option<VisibleRange> {
        if self.is_empty() {
            return None;
        }
        let start = self.scroll_offset.min(self.max_scroll_offset());
        let first = self.index_at(start);
        let last = match self.viewport_extent {
            0 => first,
            extent => self.index_at(start + u64::from(extent) - 1).max(first),
        };
        Some(VisibleRange { first, last })
    }

    /// The range to materialise: visible items plus `overscan` items on each
    /// side, clamped to `[0, len - 1]`. Pure read; calling it repeatedly
    /// without a state change returns the same range.
    pub fn visible_range(&self) -> Option<VisibleRange> {
        let visible = self.visible_items()?;
        Some(VisibleRange {
            first: visible.first.saturating_sub(self.overscan),
            last: visible
                .last
                .saturating_add(self.overscan)
                .min(self.len() - 1),
        })
    }
}
