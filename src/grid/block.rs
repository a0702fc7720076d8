use std::collections::HashMap;

use crate::error::FetchError;
use crate::slice::SubRange;
use crate::source::BlockData;

/// Default side length of a block, in cells.
///
/// 100 x 100 cells per request keeps individual responses small while a
/// screenful of a typical grid touches only a handful of blocks.
pub const DEFAULT_BLOCK_SIZE: u64 = 100;

// =============================================================================
// BlockCoord
// =============================================================================

/// Address of one block within the visible grid.
///
/// Blocks tile the visible (post-slice) coordinate space, independent of the
/// underlying dataset's real coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCoord {
    /// Block row (`cell_row / block_size`)
    pub row: u64,

    /// Block column (`cell_col / block_size`)
    pub col: u64,
}

impl BlockCoord {
    /// Create a coordinate from block indices.
    pub fn new(row: u64, col: u64) -> Self {
        Self { row, col }
    }

    /// The block owning the given visible cell.
    pub fn of_cell(row: u64, col: u64, block_size: u64) -> Self {
        Self {
            row: row / block_size,
            col: col / block_size,
        }
    }

    /// The cell range this block covers, clipped to the visible shape.
    ///
    /// Blocks at the grid edge cover less than `block_size` cells per axis;
    /// blocks entirely past the edge collapse to an empty range.
    pub fn range(&self, block_size: u64, shape: [u64; 2]) -> SubRange {
        let row_start = self.row * block_size;
        let col_start = self.col * block_size;
        SubRange::new(
            row_start,
            (row_start + block_size).min(shape[0]).max(row_start),
            col_start,
            (col_start + block_size).min(shape[1]).max(col_start),
        )
    }
}

// =============================================================================
// Block state
// =============================================================================

/// Cache state of one block.
///
/// A missing entry in the [`BlockGrid`] means the block is *absent*: nothing
/// has been requested for it in the current invalidation epoch.
#[derive(Debug, Clone)]
pub enum BlockState {
    /// A fetch is in flight; issuing another would be redundant
    Pending,

    /// Cell values are cached
    Resolved(BlockData),

    /// The fetch failed; held until an explicit retry
    Failed(FetchError),
}

/// Renderer-facing status of the block owning a cell.
///
/// Lets a renderer distinguish a cell that is merely still loading
/// (`Pending`) from one whose fetch failed (`Failed`), so it can draw an
/// error affordance instead of leaving the cell blank forever.
#[derive(Debug, Clone)]
pub enum BlockStatus {
    /// Nothing requested yet; querying the cell will trigger a fetch
    Absent,

    /// A fetch is in flight
    Pending,

    /// Data is cached; cell queries return values
    Resolved,

    /// The last fetch failed with the given error
    Failed(FetchError),
}

// =============================================================================
// BlockGrid
// =============================================================================

/// Sparse two-level map of block states: outer key is the block row, inner
/// key the block column.
///
/// Entries appear when a block is first touched and the whole grid is
/// cleared on invalidation; there is no eviction in between, which is what
/// guarantees a resolved block is never fetched twice within an epoch.
#[derive(Debug, Default)]
pub struct BlockGrid {
    rows: HashMap<u64, HashMap<u64, BlockState>>,
}

impl BlockGrid {
    /// Look up the state of a block, if any entry exists.
    pub fn get(&self, coord: BlockCoord) -> Option<&BlockState> {
        self.rows.get(&coord.row).and_then(|cols| cols.get(&coord.col))
    }

    /// Insert or overwrite the state of a block.
    pub fn insert(&mut self, coord: BlockCoord, state: BlockState) {
        self.rows.entry(coord.row).or_default().insert(coord.col, state);
    }

    /// Drop every entry, returning all blocks to absent.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Remove every failed block and return their coordinates, sorted by
    /// (row, col) so downstream notifications are deterministic.
    pub fn take_failed(&mut self) -> Vec<BlockCoord> {
        let mut failed = Vec::new();
        for (&row, cols) in self.rows.iter_mut() {
            cols.retain(|&col, state| {
                if matches!(state, BlockState::Failed(_)) {
                    failed.push(BlockCoord::new(row, col));
                    false
                } else {
                    true
                }
            });
        }
        self.rows.retain(|_, cols| !cols.is_empty());
        failed.sort_unstable_by_key(|coord| (coord.row, coord.col));
        failed
    }

    /// Count entries per state as `(resolved, pending, failed)`.
    pub fn tally(&self) -> (usize, usize, usize) {
        let mut resolved = 0;
        let mut pending = 0;
        let mut failed = 0;
        for state in self.rows.values().flat_map(|cols| cols.values()) {
            match state {
                BlockState::Resolved(_) => resolved += 1,
                BlockState::Pending => pending += 1,
                BlockState::Failed(_) => failed += 1,
            }
        }
        (resolved, pending, failed)
    }
}

// =============================================================================
// Tests
// =============================================================================
