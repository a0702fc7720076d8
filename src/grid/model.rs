//! The fetch coordinator behind the virtualized grid.
//!
//! [`GridModel`] answers synchronous cell queries from a renderer while
//! filling its block cache from an async [`DataSource`] in the background:
//!
//! ```text
//!   renderer thread                      tokio runtime
//!   ---------------                      -------------
//!   cell_value(Body, r, c) --miss--> spawn fetch_block(range)
//!        |                                  |
//!        v                                  v
//!   None (paint blank)            insert Resolved / Failed
//!                                          |
//!                                          v
//!                                 CellsChanged {r0, c0, spans}
//!                                          |
//!   repaint <------------------- observer callbacks
//! ```
//!
//! Every query and completion takes the single state mutex for a short,
//! never-suspending critical section; observer callbacks run strictly after
//! the lock is released. Stale completions are recognized by generation
//! (block fetches) or refresh sequence (metadata refreshes) and discarded
//! without touching state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::slice::{DatasetMetadata, SliceDescriptor, SliceMetadata, SubRange};
use crate::source::{BlockData, CellValue, DataSource, DatasetLocator};

use super::block::{BlockCoord, BlockGrid, BlockState, BlockStatus, DEFAULT_BLOCK_SIZE};
use super::events::{GridEvent, GridObserver, GridRegion, ObserverRegistry, SubscriberId};

// =============================================================================
// GridStats
// =============================================================================

/// Snapshot of the coordinator's cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    /// Blocks holding cached cell values
    pub resolved_blocks: usize,

    /// Blocks with a fetch in flight
    pub pending_blocks: usize,

    /// Blocks whose last fetch failed
    pub failed_blocks: usize,

    /// Invalidation epoch the counts belong to
    pub generation: u64,
}

// =============================================================================
// GridModel
// =============================================================================

/// Virtualized grid model over a lazily fetched two-dimensional dataset.
///
/// The model exposes the *visible* grid (the dataset after slicing) plus a
/// one-cell-wide header band on each axis. Cell queries never block: a miss
/// returns `None` and schedules a background block fetch, and a structured
/// [`GridEvent`] tells observers which cells to repaint once data lands.
///
/// Cloning is cheap and clones share all state. When the last clone drops,
/// in-flight fetches complete against a dead weak reference and are
/// discarded.
///
/// ```ignore
/// let model = GridModel::new(source);
/// model.initialize(locator, "0:250, :", initial_meta);
///
/// let id = model.subscribe(renderer.clone());
/// assert_eq!(model.row_count(GridRegion::Body), 250);
///
/// // Miss: schedules a fetch for block (1, 0), repaint comes via the
/// // observer once the block resolves.
/// assert_eq!(model.cell_value(GridRegion::Body, 150, 3), None);
/// ```
#[derive(Clone)]
pub struct GridModel {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    source: Arc<dyn DataSource>,
    runtime: Handle,
    block_size: u64,
    state: Mutex<ModelState>,
    observers: ObserverRegistry,
    ready_tx: watch::Sender<bool>,
}

/// Everything guarded by the state mutex.
#[derive(Default)]
struct ModelState {
    dataset: Option<DatasetLocator>,
    slice: String,
    metadata: SliceMetadata,
    blocks: BlockGrid,

    /// Bumped on every cache invalidation; block fetches carry the value
    /// current when they were issued and are discarded on mismatch.
    generation: u64,

    /// Bumped when a refresh *starts*; only the metadata of the most
    /// recently started refresh may be applied, so the last call wins
    /// regardless of response arrival order.
    refresh_seq: u64,
}

/// Parameters snapshotted under the lock for one block fetch task.
struct BlockFetch {
    dataset: DatasetLocator,
    slice: String,
    generation: u64,
    coord: BlockCoord,
    range: SubRange,
}

impl GridModel {
    /// Create a model with the default block size of
    /// [`DEFAULT_BLOCK_SIZE`] cells per side.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime; the model captures the
    /// current runtime handle for spawning background fetches.
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self::with_block_size(source, DEFAULT_BLOCK_SIZE)
    }

    /// Create a model with a custom block size.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is zero or if called outside a tokio runtime.
    pub fn with_block_size(source: Arc<dyn DataSource>, block_size: u64) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        let (ready_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ModelInner {
                source,
                runtime: Handle::current(),
                block_size,
                state: Mutex::new(ModelState::default()),
                observers: ObserverRegistry::new(),
                ready_tx,
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Bind the model to a dataset and apply its first metadata.
    ///
    /// Synchronous: on return the counts and labels reflect `metadata`, the
    /// structural events have been delivered, and the model is ready. The
    /// first fetch round trip is the caller's, made before constructing the
    /// model, so a freshly initialized grid never renders at size zero.
    ///
    /// A second call is ignored with a warning; use [`set_slice`] or
    /// [`refresh`] to change what is displayed.
    ///
    /// [`set_slice`]: GridModel::set_slice
    /// [`refresh`]: GridModel::refresh
    pub fn initialize(&self, dataset: DatasetLocator, slice: &str, metadata: DatasetMetadata) {
        let events = {
            let mut state = self.inner.state.lock();
            if state.dataset.is_some() {
                warn!("Initialize called twice ({}); ignoring", dataset);
                return;
            }
            debug!("Initializing grid model for {} with slice '{}'", dataset, slice);
            state.dataset = Some(dataset);
            state.slice = slice.to_string();
            ModelInner::apply_metadata(&mut state, metadata)
        };
        self.inner.observers.emit_all(&events);
        self.inner.ready_tx.send_replace(true);
        self.inner.observers.emit_ready();
    }

    /// Change the slice expression and refresh in the background.
    ///
    /// Returns immediately; the displayed grid keeps its current extent and
    /// data until the refresh round trip completes. If several calls race,
    /// the most recent one wins. Errors are logged and leave the displayed
    /// state untouched; call [`refresh`](GridModel::refresh) to observe the
    /// error directly.
    pub fn set_slice(&self, slice: &str) {
        {
            let mut state = self.inner.state.lock();
            if state.dataset.is_none() {
                warn!("set_slice called before initialize; ignoring");
                return;
            }
            debug!("Slice changed from '{}' to '{}'", state.slice, slice);
            state.slice = slice.to_string();
        }
        self.spawn_refresh();
    }

    /// Re-fetch metadata for the current slice and, on success, swap it in
    /// and drop all cached blocks.
    ///
    /// On failure the displayed metadata, cache, and counts are left
    /// exactly as they were. A refresh that is superseded by a newer one
    /// before its response arrives is discarded silently.
    ///
    /// # Errors
    ///
    /// Propagates the [`FetchError`] from the metadata fetch.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        let Some((dataset, slice, seq)) = self.inner.begin_refresh() else {
            warn!("Refresh called before initialize; ignoring");
            return Ok(());
        };
        let metadata = self.inner.source.fetch_metadata(&dataset, &slice).await?;
        self.inner.apply_refresh(seq, metadata);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Renderer queries
    // -------------------------------------------------------------------------

    /// Number of rows in a region: the visible row count for the body,
    /// 1 for the header band.
    pub fn row_count(&self, region: GridRegion) -> u64 {
        match region {
            GridRegion::Body => self.inner.state.lock().metadata.visible_rows(),
            _ => 1,
        }
    }

    /// Number of columns in a region: the visible column count for the
    /// body, 1 for the header band.
    pub fn column_count(&self, region: GridRegion) -> u64 {
        match region {
            GridRegion::Body => self.inner.state.lock().metadata.visible_columns(),
            _ => 1,
        }
    }

    /// The value to paint at (`row`, `column`) of `region`, or `None` if
    /// there is nothing to paint yet.
    ///
    /// Never blocks and never suspends. Header labels are computed locally
    /// from the slice descriptors. For body cells a cache miss returns
    /// `None` *and* schedules a background fetch of the owning block; at
    /// most one fetch is ever in flight per block, no matter how often the
    /// renderer asks. Cells of pending or failed blocks stay `None` (see
    /// [`block_status`](GridModel::block_status) to tell the two apart).
    pub fn cell_value(&self, region: GridRegion, row: u64, column: u64) -> Option<CellValue> {
        match region {
            GridRegion::RowHeader => {
                let label = self.row_labels().label_at(row);
                Some(CellValue::String(label.to_string()))
            }
            GridRegion::ColumnHeader => {
                let label = self.column_labels().label_at(column);
                Some(CellValue::String(label.to_string()))
            }
            GridRegion::CornerHeader => None,
            GridRegion::Body => self.body_cell(row, column),
        }
    }

    /// Cache status of the block owning body cell (`row`, `column`).
    ///
    /// Purely observational: unlike [`cell_value`](GridModel::cell_value),
    /// asking does not schedule anything.
    pub fn block_status(&self, row: u64, column: u64) -> BlockStatus {
        let state = self.inner.state.lock();
        match state.blocks.get(BlockCoord::of_cell(row, column, self.inner.block_size)) {
            None => BlockStatus::Absent,
            Some(BlockState::Pending) => BlockStatus::Pending,
            Some(BlockState::Resolved(_)) => BlockStatus::Resolved,
            Some(BlockState::Failed(err)) => BlockStatus::Failed(err.clone()),
        }
    }

    /// Forget every failed block so the next cell query re-fetches it, and
    /// notify observers to repaint the affected cells.
    ///
    /// Returns the number of blocks cleared. Failed blocks are never
    /// retried implicitly; this is the explicit way back.
    pub fn retry_failed(&self) -> usize {
        let events = {
            let mut state = self.inner.state.lock();
            let shape = state.metadata.visible_shape();
            let block_size = self.inner.block_size;
            state
                .blocks
                .take_failed()
                .into_iter()
                .map(|coord| cells_changed(coord.range(block_size, shape)))
                .collect::<Vec<_>>()
        };
        let count = events.len();
        if count > 0 {
            debug!("Cleared {} failed block(s) for retry", count);
        }
        self.inner.observers.emit_all(&events);
        count
    }

    // -------------------------------------------------------------------------
    // Observers and readiness
    // -------------------------------------------------------------------------

    /// Register an observer for change, ready, and refreshed callbacks.
    pub fn subscribe(&self, observer: Arc<dyn GridObserver>) -> SubscriberId {
        self.inner.observers.subscribe(observer)
    }

    /// Remove a registration. Returns false if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    /// Wait until the model has applied its first metadata.
    ///
    /// Completes immediately if [`initialize`](GridModel::initialize) has
    /// already run.
    pub async fn ready(&self) {
        let mut rx = self.inner.ready_tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Whether the first metadata application has happened.
    pub fn is_ready(&self) -> bool {
        *self.inner.ready_tx.borrow()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Row labels of the visible grid (start/stop/step over real indices).
    pub fn row_labels(&self) -> SliceDescriptor {
        self.inner.state.lock().metadata.row_labels()
    }

    /// Column labels of the visible grid.
    pub fn column_labels(&self) -> SliceDescriptor {
        self.inner.state.lock().metadata.column_labels()
    }

    /// The slice expression queries are currently issued with.
    pub fn slice_string(&self) -> String {
        self.inner.state.lock().slice.clone()
    }

    /// The dataset the model was initialized for, if any.
    pub fn dataset(&self) -> Option<DatasetLocator> {
        self.inner.state.lock().dataset.clone()
    }

    /// Cells per block side.
    pub fn block_size(&self) -> u64 {
        self.inner.block_size
    }

    /// Current cache occupancy and invalidation epoch.
    pub fn stats(&self) -> GridStats {
        let state = self.inner.state.lock();
        let (resolved, pending, failed) = state.blocks.tally();
        GridStats {
            resolved_blocks: resolved,
            pending_blocks: pending,
            failed_blocks: failed,
            generation: state.generation,
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn body_cell(&self, row: u64, column: u64) -> Option<CellValue> {
        let block_size = self.inner.block_size;
        let fetch = {
            let mut state = self.inner.state.lock();
            let shape = state.metadata.visible_shape();
            if row >= shape[0] || column >= shape[1] {
                return None;
            }
            let coord = BlockCoord::of_cell(row, column, block_size);
            match state.blocks.get(coord) {
                Some(BlockState::Resolved(data)) => {
                    let rel_row = (row % block_size) as usize;
                    let rel_col = (column % block_size) as usize;
                    return data.get(rel_row).and_then(|r| r.get(rel_col)).cloned();
                }
                Some(BlockState::Pending) | Some(BlockState::Failed(_)) => return None,
                None => {}
            }
            let Some(dataset) = state.dataset.clone() else {
                return None;
            };
            state.blocks.insert(coord, BlockState::Pending);
            BlockFetch {
                dataset,
                slice: state.slice.clone(),
                generation: state.generation,
                coord,
                range: coord.range(block_size, shape),
            }
        };
        self.spawn_block_fetch(fetch);
        None
    }

    fn spawn_block_fetch(&self, fetch: BlockFetch) {
        let weak = Arc::downgrade(&self.inner);
        let source = self.inner.source.clone();
        self.inner.runtime.spawn(async move {
            debug!(
                generation = fetch.generation,
                "Fetching block {} of {}",
                fetch.range,
                fetch.dataset
            );
            let result = source.fetch_block(&fetch.dataset, &fetch.slice, &fetch.range).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.finish_block_fetch(fetch, result);
        });
    }

    fn spawn_refresh(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some((dataset, slice, seq)) = inner.begin_refresh() else {
                return;
            };
            let source = inner.source.clone();
            // Hold only a weak reference across the await so dropping the
            // last model clone is not delayed by an in-flight refresh.
            drop(inner);

            let result = source.fetch_metadata(&dataset, &slice).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match result {
                Ok(metadata) => inner.apply_refresh(seq, metadata),
                Err(err) => {
                    warn!("Background refresh of {} ('{}') failed: {}", dataset, slice, err);
                }
            }
        });
    }
}

impl ModelInner {
    /// Snapshot what a refresh needs and claim the next refresh slot.
    /// Returns `None` when the model was never initialized.
    fn begin_refresh(&self) -> Option<(DatasetLocator, String, u64)> {
        let mut state = self.state.lock();
        let dataset = state.dataset.clone()?;
        state.refresh_seq += 1;
        Some((dataset, state.slice.clone(), state.refresh_seq))
    }

    /// Apply refreshed metadata unless a newer refresh has started since
    /// `seq` was claimed.
    fn apply_refresh(&self, seq: u64, metadata: DatasetMetadata) {
        let (events, slice) = {
            let mut state = self.state.lock();
            if state.refresh_seq != seq {
                debug!(
                    seq = seq,
                    latest = state.refresh_seq,
                    "Discarding superseded refresh"
                );
                return;
            }
            let events = Self::apply_metadata(&mut state, metadata);
            (events, state.slice.clone())
        };
        self.observers.emit_all(&events);
        self.observers.emit_refreshed(&slice);
    }

    /// Swap in new metadata and invalidate the block cache, producing the
    /// structural event sequence observers rely on: removals for the old
    /// extent, insertions for the new one, then a reset.
    fn apply_metadata(state: &mut ModelState, metadata: DatasetMetadata) -> Vec<GridEvent> {
        let old_rows = state.metadata.visible_rows();
        let old_cols = state.metadata.visible_columns();

        state.blocks.clear();
        state.generation += 1;
        state.metadata.replace(metadata);

        let [new_rows, new_cols] = state.metadata.visible_shape();
        debug!(
            generation = state.generation,
            "Applied metadata: {}x{} -> {}x{}",
            old_rows,
            old_cols,
            new_rows,
            new_cols
        );

        vec![
            GridEvent::RowsRemoved { index: 0, span: old_rows },
            GridEvent::ColumnsRemoved { index: 0, span: old_cols },
            GridEvent::RowsInserted { index: 0, span: state.metadata.visible_rows() },
            GridEvent::ColumnsInserted { index: 0, span: state.metadata.visible_columns() },
            GridEvent::ModelReset,
        ]
    }

    /// Record a block fetch outcome, unless the cache was invalidated
    /// after the fetch was issued.
    fn finish_block_fetch(&self, fetch: BlockFetch, result: Result<BlockData, FetchError>) {
        let event = {
            let mut state = self.state.lock();
            if state.generation != fetch.generation {
                debug!(
                    issued = fetch.generation,
                    current = state.generation,
                    "Discarding stale block {}",
                    fetch.range
                );
                return;
            }
            let block_state = match result {
                Ok(data) => BlockState::Resolved(data),
                Err(err) => {
                    warn!("Block fetch {} of {} failed: {}", fetch.range, fetch.dataset, err);
                    BlockState::Failed(err)
                }
            };
            state.blocks.insert(fetch.coord, block_state);
            cells_changed(fetch.range)
        };
        self.observers.emit(&event);
    }
}

/// The repaint event for one block's cell range.
fn cells_changed(range: SubRange) -> GridEvent {
    GridEvent::CellsChanged {
        row: range.row_start,
        column: range.col_start,
        row_span: range.row_span(),
        column_span: range.col_span(),
    }
}

// =============================================================================
// Tests
// =============================================================================
