//! # slicegrid
//!
//! A virtualized grid model for huge two-dimensional datasets fetched
//! lazily over a slow boundary.
//!
//! The dataset behind the grid may hold billions of cells on a remote
//! server; the renderer in front of it asks for one cell at a time and
//! must never wait. `slicegrid` sits between the two: it answers cell
//! queries from a cache of fixed-size blocks, fetches missing blocks in
//! the background, and tells the renderer exactly which cells to repaint
//! when data arrives.
//!
//! ## Features
//!
//! - **Non-blocking queries**: [`GridModel::cell_value`] is synchronous
//!   and never suspends; misses return `None` and resolve via events
//! - **Block-level caching**: cells travel in square blocks
//!   ([`DEFAULT_BLOCK_SIZE`] per side), fetched at most once each
//! - **Slice views**: the grid shows a slice of the dataset, with header
//!   labels mapping visible indices back to real ones
//! - **Stale-response hygiene**: superseded refreshes and outdated block
//!   fetches are discarded, never applied
//! - **Failure tracking**: failed blocks are held with their error and
//!   re-fetched only on an explicit [`GridModel::retry_failed`]
//!
//! ## Architecture
//!
//! - [`grid`] - block cache, change events, and the [`GridModel`]
//!   coordinator
//! - [`slice`] - slice descriptors and dataset metadata
//! - [`source`] - the async [`DataSource`] boundary trait
//! - [`error`] - the fetch error taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use slicegrid::{DatasetLocator, GridModel, GridRegion};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(HdfSource::connect("http://localhost:8000"));
//!     let locator = DatasetLocator::new("measurements.h5", "/run1/frames");
//!
//!     // One metadata round trip up front, then the model is live.
//!     let meta = source.fetch_metadata(&locator, ":, :").await.unwrap();
//!     let model = GridModel::new(source);
//!     model.initialize(locator, ":, :", meta);
//!
//!     model.subscribe(my_renderer);
//!     let rows = model.row_count(GridRegion::Body);
//!
//!     // Narrow the view; the refresh happens in the background and the
//!     // renderer is notified when the new extent is in place.
//!     model.set_slice("0:500, 10:20");
//! }
//! ```

pub mod error;
pub mod grid;
pub mod slice;
pub mod source;

// Re-export commonly used types
pub use error::FetchError;
pub use grid::{
    BlockStatus, GridEvent, GridModel, GridObserver, GridRegion, GridStats, SubscriberId,
    DEFAULT_BLOCK_SIZE,
};
pub use slice::{DatasetMetadata, SliceDescriptor, SliceMetadata, SubRange};
pub use source::{BlockData, CellValue, DataSource, DatasetLocator};
