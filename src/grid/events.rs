use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

// =============================================================================
// Regions
// =============================================================================

/// The rendering zone a queried cell belongs to.
///
/// The grid a consumer paints is larger than the data itself: a header row
/// on top, a header column on the left, and the corner where they meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridRegion {
    /// Data cells
    Body,

    /// The single column of row labels on the left
    RowHeader,

    /// The single row of column labels on top
    ColumnHeader,

    /// The top-left corner cell above the row header
    CornerHeader,
}

// =============================================================================
// Events
// =============================================================================

/// A structured change notification.
///
/// Events describe *what part* of the grid changed so a renderer can repaint
/// exactly that part. All indices and spans are in visible body coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    /// `span` rows disappeared starting at `index`
    RowsRemoved { index: u64, span: u64 },

    /// `span` columns disappeared starting at `index`
    ColumnsRemoved { index: u64, span: u64 },

    /// `span` rows appeared starting at `index`
    RowsInserted { index: u64, span: u64 },

    /// `span` columns appeared starting at `index`
    ColumnsInserted { index: u64, span: u64 },

    /// Everything changed; discard cached geometry and repaint
    ModelReset,

    /// The rectangle of body cells starting at (`row`, `column`) changed
    CellsChanged {
        row: u64,
        column: u64,
        row_span: u64,
        column_span: u64,
    },
}

// =============================================================================
// Observers
// =============================================================================

/// Callbacks a consumer registers to follow the model.
///
/// `on_change` fires for every structural or cell-level change.  The other
/// two hooks have empty default bodies so observers implement only what
/// they care about.
///
/// Callbacks run outside the model's internal locks, so an observer may
/// call back into the model (including subscribing or unsubscribing) from
/// within a callback.
pub trait GridObserver: Send + Sync {
    /// A part of the grid changed.
    fn on_change(&self, event: &GridEvent);

    /// The model completed its first metadata application and is usable.
    fn on_ready(&self) {}

    /// A refresh completed and its metadata was applied; `slice` is the
    /// slice string the refresh was issued for.
    fn on_refreshed(&self, slice: &str) {
        let _ = slice;
    }
}

/// Handle identifying one observer registration.
///
/// Returned by [`crate::GridModel::subscribe`]; pass it back to
/// [`crate::GridModel::unsubscribe`] to stop receiving callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Registered observers plus the id counter handing out [`SubscriberId`]s.
///
/// Emission snapshots the observer list and invokes callbacks with no lock
/// held, so callbacks can re-enter the registry freely.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(SubscriberId, Arc<dyn GridObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer and return its id.
    pub fn subscribe(&self, observer: Arc<dyn GridObserver>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove a registration. Returns false if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(sid, _)| *sid != id);
        observers.len() != before
    }

    /// Deliver one event to every observer.
    pub fn emit(&self, event: &GridEvent) {
        for observer in self.snapshot() {
            observer.on_change(event);
        }
    }

    /// Deliver a sequence of events, in order, to every observer.
    ///
    /// The list is snapshotted once, so every observer sees the same
    /// sequence even if one of them mutates the registry mid-delivery.
    pub fn emit_all(&self, events: &[GridEvent]) {
        if events.is_empty() {
            return;
        }
        let observers = self.snapshot();
        for event in events {
            for observer in &observers {
                observer.on_change(event);
            }
        }
    }

    pub fn emit_ready(&self) {
        for observer in self.snapshot() {
            observer.on_ready();
        }
    }

    pub fn emit_refreshed(&self, slice: &str) {
        for observer in self.snapshot() {
            observer.on_refreshed(slice);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn GridObserver>> {
        self.observers.read().iter().map(|(_, obs)| obs.clone()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
