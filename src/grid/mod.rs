//! The virtualized grid: block cache, change events, and the coordinator
//! that keeps a renderer's synchronous world and the async data source in
//! step.
//!
//! ```text
//!                 +-------------------------------+
//!   renderer ---> |           GridModel           | ---> DataSource
//!   (sync query)  |  ModelState (mutex)           |      (async fetch)
//!                 |   +- SliceMetadata            |
//!                 |   +- BlockGrid (row -> col    |
//!                 |   |    -> Pending/Resolved/   |
//!                 |   |       Failed)             |
//!                 |   +- generation / refresh_seq |
//!                 |  ObserverRegistry ------------+---> GridObserver
//!                 +-------------------------------+     (repaint)
//! ```
//!
//! Blocks are fixed-size square tiles of the visible coordinate space.
//! The model fills them on demand: a cell query that misses schedules a
//! fetch for the owning block and returns nothing, and a
//! [`GridEvent::CellsChanged`] arrives once the block resolves.

mod block;
mod events;
mod model;

pub use block::{BlockStatus, DEFAULT_BLOCK_SIZE};
pub use events::{GridEvent, GridObserver, GridRegion, SubscriberId};
pub use model::{GridModel, GridStats};
