//! The data-source boundary.
//!
//! Everything the grid model knows about the outside world goes through
//! [`DataSource`]: one async operation to fetch the metadata of a
//! (dataset, slice) pair and one to fetch a sub-rectangle of cell values.
//! A production implementation typically wraps an HTTP client talking to a
//! dataset service; tests use in-memory mocks. Implementations must be
//! thread-safe.
//!
//! Slice strings are opaque to this crate: they are round-tripped to the
//! service verbatim, and the service answers with the resulting visible
//! shape and labels. Sub-ranges are typed ([`SubRange`]) and carry their
//! wire form in their `Display` implementation.

use std::fmt;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::slice::{DatasetMetadata, SubRange};

/// A single cell value as returned by the data service.
///
/// The service hands back JSON, so values can be numbers, strings, booleans
/// or nulls depending on the dataset's element type.
pub type CellValue = serde_json::Value;

/// A row-major 2-D array of cell values covering one block.
pub type BlockData = Vec<Vec<CellValue>>;

/// Identifies one dataset at the boundary: a resource (e.g. a file path
/// known to the service) plus the object path of the array within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetLocator {
    /// Resource identifier, e.g. a server-relative file path
    pub resource: String,

    /// Path of the array object within the resource, e.g. `/group/data`
    pub object_path: String,
}

impl DatasetLocator {
    /// Create a new locator.
    pub fn new(resource: impl Into<String>, object_path: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            object_path: object_path.into(),
        }
    }
}

impl fmt::Display for DatasetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.object_path)
    }
}

/// Boundary trait for fetching slice metadata and block data.
///
/// Both operations are asynchronous and keyed by (dataset, slice string);
/// block fetches additionally carry the sub-range. The grid model issues at
/// most one block fetch per block per invalidation epoch, so implementations
/// do not need their own request deduplication.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the visible shape and axis labels for `dataset` under `slice`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Transport`] on network/server failure,
    /// [`FetchError::NotFound`] if the dataset does not exist,
    /// [`FetchError::InvalidSlice`] if the service rejects the slice string.
    async fn fetch_metadata(
        &self,
        dataset: &DatasetLocator,
        slice: &str,
    ) -> Result<DatasetMetadata, FetchError>;

    /// Fetch the cell values of `range` within the visible grid of
    /// `dataset` under `slice`.
    ///
    /// The returned array's dimensions match the range's spans (blocks at
    /// the grid edge are smaller than full blocks).
    ///
    /// # Errors
    ///
    /// Same kinds as [`fetch_metadata`](Self::fetch_metadata), plus
    /// [`FetchError::OutOfRange`] if the range exceeds the visible shape.
    async fn fetch_block(
        &self,
        dataset: &DatasetLocator,
        slice: &str,
        range: &SubRange,
    ) -> Result<BlockData, FetchError>;
}
