//! Tests for slice changes and refreshes: the structural event sequence,
//! cache invalidation, and the discarding of superseded or stale
//! responses.

use std::time::Duration;

use serde_json::json;

use slicegrid::{BlockStatus, FetchError, GridEvent, GridModel, GridRegion};

use super::test_utils::{locator, meta, wait_until, MockDataSource, Note, RecordingObserver};

#[tokio::test]
async fn test_refresh_emits_removals_then_insertions_then_reset() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));
    observer.clear();

    source.set_metadata_for(":, :", meta(7, 3));
    model.refresh().await.unwrap();

    assert_eq!(
        observer.notes(),
        vec![
            Note::Change(GridEvent::RowsRemoved { index: 0, span: 100 }),
            Note::Change(GridEvent::ColumnsRemoved { index: 0, span: 10 }),
            Note::Change(GridEvent::RowsInserted { index: 0, span: 7 }),
            Note::Change(GridEvent::ColumnsInserted { index: 0, span: 3 }),
            Note::Change(GridEvent::ModelReset),
            Note::Refreshed(":, :".to_string()),
        ]
    );
    assert_eq!(model.row_count(GridRegion::Body), 7);
    assert_eq!(model.column_count(GridRegion::Body), 3);
}

#[tokio::test]
async fn test_set_slice_applies_in_background() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    source.set_metadata_for("0:7, 0:3", meta(7, 3));
    source.set_metadata_delay("0:7, 0:3", Duration::from_millis(20));
    model.set_slice("0:7, 0:3");

    // The old extent stays on screen while the round trip is in flight.
    assert_eq!(model.row_count(GridRegion::Body), 100);
    assert_eq!(model.slice_string(), "0:7, 0:3");

    let m = model.clone();
    wait_until(move || m.row_count(GridRegion::Body) == 7).await;
    assert_eq!(model.column_count(GridRegion::Body), 3);
    assert_eq!(source.meta_log(), vec!["0:7, 0:3".to_string()]);
}

#[tokio::test]
async fn test_rapid_slice_changes_settle_on_the_last() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));
    observer.clear();

    source.set_metadata_for("0:50, :", meta(50, 10));
    source.set_metadata_for("0:7, :", meta(7, 10));
    model.set_slice("0:50, :");
    model.set_slice("0:7, :");

    let m = model.clone();
    wait_until(move || m.row_count(GridRegion::Body) == 7).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Exactly one refresh was applied, for the final slice.
    assert_eq!(model.row_count(GridRegion::Body), 7);
    let refreshed: Vec<_> = observer
        .notes()
        .into_iter()
        .filter(|note| matches!(note, Note::Refreshed(_)))
        .collect();
    assert_eq!(refreshed, vec![Note::Refreshed("0:7, :".to_string())]);
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), "slow", meta(100, 10));
    observer.clear();

    // A slow refresh for the current slice...
    source.set_metadata_for("slow", meta(500, 500));
    source.set_metadata_delay("slow", Duration::from_millis(60));
    let slow = {
        let model = model.clone();
        tokio::spawn(async move { model.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // ...overtaken by a fast slice change.
    source.set_metadata_for("fast", meta(7, 3));
    model.set_slice("fast");
    let m = model.clone();
    wait_until(move || m.row_count(GridRegion::Body) == 7).await;

    // The slow response arrives afterwards and must not be applied.
    slow.await.unwrap().unwrap();
    assert_eq!(model.row_count(GridRegion::Body), 7);
    assert_eq!(model.column_count(GridRegion::Body), 3);

    let refreshed: Vec<_> = observer
        .notes()
        .into_iter()
        .filter(|note| matches!(note, Note::Refreshed(_)))
        .collect();
    assert_eq!(refreshed, vec![Note::Refreshed("fast".to_string())]);
    // Both fetches happened; one invalidation for initialize, one for the
    // applied refresh.
    assert_eq!(source.meta_calls(), 2);
    assert_eq!(model.stats().generation, 2);
}

#[tokio::test]
async fn test_failed_refresh_leaves_displayed_state() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    assert_eq!(model.cell_value(GridRegion::Body, 5, 5), None);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;
    observer.clear();

    source.set_metadata_error(Some(FetchError::Transport("connection reset".to_string())));
    let err = model.refresh().await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));

    // Extent, cache, and generation all untouched; nothing to repaint.
    assert_eq!(model.row_count(GridRegion::Body), 100);
    assert_eq!(model.stats().resolved_blocks, 1);
    assert_eq!(model.stats().generation, 1);
    assert_eq!(model.cell_value(GridRegion::Body, 5, 5), Some(json!(50_005)));
    assert!(observer.notes().is_empty());
}

#[tokio::test]
async fn test_refresh_drops_cached_blocks() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;

    model.refresh().await.unwrap();
    assert_eq!(model.stats().resolved_blocks, 0);
    assert!(matches!(model.block_status(0, 0), BlockStatus::Absent));

    // The next touch fetches the block afresh.
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;
    assert_eq!(source.block_calls(), 2);
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), Some(json!(0)));
}

#[tokio::test]
async fn test_blocks_issued_before_invalidation_are_discarded() {
    let source = MockDataSource::with_gated_blocks(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    // Fetch in flight under the old generation.
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let s = source.clone();
    wait_until(move || s.block_calls() == 1).await;

    model.refresh().await.unwrap();
    observer.clear();

    // Let the stale response land: it must vanish without trace.
    source.release_blocks(1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(model.stats().resolved_blocks, 0);
    assert!(matches!(model.block_status(0, 0), BlockStatus::Absent));
    assert!(observer.cells_changed().is_empty());

    // A fresh touch fetches again under the new generation.
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    source.release_blocks(1);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;
    assert_eq!(source.block_calls(), 2);
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), Some(json!(0)));
}
