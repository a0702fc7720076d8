use serde::{Deserialize, Serialize};

use super::SliceDescriptor;

// =============================================================================
// DatasetMetadata
// =============================================================================

/// Shape and axis labels of the visible grid for one (dataset, slice) pair.
///
/// Produced by the metadata endpoint and swapped in wholesale on every
/// re-slice or refresh; never mutated in place. `visible_labels[0]`
/// describes the row axis, `visible_labels[1]` the column axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// `[rows, columns]` of the grid after applying the slice
    pub visible_shape: [u64; 2],

    /// Row and column slice descriptors mapping visible indices back to
    /// dataset indices
    pub visible_labels: [SliceDescriptor; 2],
}

impl DatasetMetadata {
    /// Create metadata from a visible shape and its axis labels.
    pub fn new(visible_shape: [u64; 2], visible_labels: [SliceDescriptor; 2]) -> Self {
        Self {
            visible_shape,
            visible_labels,
        }
    }
}

// =============================================================================
// SliceMetadata
// =============================================================================

/// The possibly-absent current metadata plus derived read-only queries.
///
/// Before initialization (and between construction and the first metadata
/// swap) there is no metadata; every accessor stays total by reporting zero
/// counts and the [`SliceDescriptor::NOOP`] sentinel. No accessor performs
/// I/O or can fail.
#[derive(Debug, Clone, Default)]
pub struct SliceMetadata {
    meta: Option<DatasetMetadata>,
}

impl SliceMetadata {
    /// Create an empty holder with no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether metadata has been installed.
    pub fn is_present(&self) -> bool {
        self.meta.is_some()
    }

    /// Swap in new metadata, returning the previous metadata if any.
    pub fn replace(&mut self, meta: DatasetMetadata) -> Option<DatasetMetadata> {
        self.meta.replace(meta)
    }

    /// Number of visible rows; 0 if metadata is absent.
    pub fn visible_rows(&self) -> u64 {
        self.meta.as_ref().map_or(0, |m| m.visible_shape[0])
    }

    /// Number of visible columns; 0 if metadata is absent.
    pub fn visible_columns(&self) -> u64 {
        self.meta.as_ref().map_or(0, |m| m.visible_shape[1])
    }

    /// `[rows, columns]` of the visible grid; `[0, 0]` if metadata is absent.
    pub fn visible_shape(&self) -> [u64; 2] {
        self.meta.as_ref().map_or([0, 0], |m| m.visible_shape)
    }

    /// Row-axis slice descriptor; the no-op sentinel if metadata is absent.
    pub fn row_labels(&self) -> SliceDescriptor {
        self.meta
            .as_ref()
            .map_or(SliceDescriptor::NOOP, |m| m.visible_labels[0])
    }

    /// Column-axis slice descriptor; the no-op sentinel if metadata is absent.
    pub fn column_labels(&self) -> SliceDescriptor {
        self.meta
            .as_ref()
            .map_or(SliceDescriptor::NOOP, |m| m.visible_labels[1])
    }
}

// =============================================================================
// Tests
// =============================================================================
