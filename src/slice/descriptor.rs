use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// SliceDescriptor
// =============================================================================

/// A `(start, stop, step)` selection along one axis of the underlying
/// dataset.
///
/// Descriptors arrive from the metadata endpoint as part of
/// [`DatasetMetadata`](super::DatasetMetadata) and describe which real
/// dataset indices the visible grid axes map to. Invariants: `step != 0`,
/// and `start <= stop` whenever `step > 0`.
///
/// The [`NOOP`](Self::NOOP) sentinel (`0:0:1`, an empty selection) stands in
/// for "no metadata yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceDescriptor {
    /// First selected dataset index
    pub start: i64,

    /// End of the selection (exclusive)
    pub stop: i64,

    /// Stride between selected indices; negative steps walk backwards
    pub step: i64,
}

impl SliceDescriptor {
    /// The "no metadata yet" sentinel: an empty selection.
    pub const NOOP: SliceDescriptor = SliceDescriptor {
        start: 0,
        stop: 0,
        step: 1,
    };

    /// Create a new descriptor.
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        Self { start, stop, step }
    }

    /// Whether this is the no-op sentinel.
    pub fn is_noop(&self) -> bool {
        *self == Self::NOOP
    }

    /// Number of dataset indices this slice selects.
    pub fn len(&self) -> u64 {
        if self.step == 0 {
            return 0;
        }
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        (span as u64).div_ceil(self.step.unsigned_abs())
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a visible (post-slice) index back to the underlying dataset
    /// index: `start + index * step`.
    ///
    /// This is what header cells display, so that labels reflect real
    /// dataset coordinates rather than visible ones.
    pub fn label_at(&self, index: u64) -> i64 {
        self.start + index as i64 * self.step
    }
}

impl Default for SliceDescriptor {
    fn default() -> Self {
        Self::NOOP
    }
}

// =============================================================================
// SubRange
// =============================================================================

/// A half-open sub-rectangle `[row_start, row_stop) x [col_start, col_stop)`
/// of the visible grid.
///
/// This is the unit of a block-data request. The `Display` implementation
/// renders the canonical wire form the data service consumes, e.g.
/// `"100:200, 0:50"`, so a transport implementation only has to
/// `to_string()` it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    /// First visible row (inclusive)
    pub row_start: u64,

    /// Last visible row (exclusive)
    pub row_stop: u64,

    /// First visible column (inclusive)
    pub col_start: u64,

    /// Last visible column (exclusive)
    pub col_stop: u64,
}

impl SubRange {
    /// Create a new sub-range. Both ranges are half-open.
    pub fn new(row_start: u64, row_stop: u64, col_start: u64, col_stop: u64) -> Self {
        Self {
            row_start,
            row_stop,
            col_start,
            col_stop,
        }
    }

    /// Number of rows covered.
    pub fn row_span(&self) -> u64 {
        self.row_stop - self.row_start
    }

    /// Number of columns covered.
    pub fn col_span(&self) -> u64 {
        self.col_stop - self.col_start
    }
}

impl fmt::Display for SubRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}, {}:{}",
            self.row_start, self.row_stop, self.col_start, self.col_stop
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
