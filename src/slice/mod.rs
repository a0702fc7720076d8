//! Slice descriptors and visible-view metadata.
//!
//! A slice selects a sub-range along each axis of the underlying dataset.
//! Applying the active slice to the dataset yields the *visible* grid: the
//! fixed-size coordinate space the rest of the crate works in. This module
//! holds the pure data side of that mapping:
//!
//! - [`SliceDescriptor`]: a `(start, stop, step)` selection along one axis
//! - [`SubRange`]: a half-open sub-rectangle of the visible grid, rendered
//!   to the wire form consumed by the data service
//! - [`DatasetMetadata`]: the shape and axis labels of the visible grid, as
//!   returned by the metadata endpoint
//! - [`SliceMetadata`]: the possibly-absent current metadata plus total,
//!   side-effect-free accessors over it
//!
//! Nothing here performs I/O; fetching and caching live in [`crate::grid`].

mod descriptor;
mod metadata;

pub use descriptor::{SliceDescriptor, SubRange};
pub use metadata::{DatasetMetadata, SliceMetadata};
