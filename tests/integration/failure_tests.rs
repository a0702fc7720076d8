//! Tests for block fetch failures: error retention, explicit retry, and
//! the behavior of in-flight work when the model goes away.

use std::time::Duration;

use serde_json::json;

use slicegrid::{BlockStatus, FetchError, GridEvent, GridModel, GridRegion};

use super::test_utils::{locator, meta, wait_until, MockDataSource, RecordingObserver};

#[tokio::test]
async fn test_failed_block_is_held_not_refetched() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));
    observer.clear();

    source.set_block_error(Some(FetchError::Transport("timeout".to_string())));
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().failed_blocks == 1).await;

    // The failure is repainted (so the renderer re-queries and can show an
    // error affordance) and held with its error.
    assert_eq!(
        observer.cells_changed(),
        vec![GridEvent::CellsChanged { row: 0, column: 0, row_span: 100, column_span: 10 }]
    );
    match model.block_status(0, 0) {
        BlockStatus::Failed(FetchError::Transport(msg)) => assert_eq!(msg, "timeout"),
        other => panic!("expected failed status, got {other:?}"),
    }

    // Asking again returns None without a new fetch.
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    assert_eq!(model.cell_value(GridRegion::Body, 99, 9), None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.block_calls(), 1);
}

#[tokio::test]
async fn test_retry_failed_refetches_cleared_blocks() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    let observer = RecordingObserver::new();
    model.subscribe(observer.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    source.set_block_error(Some(FetchError::Transport("timeout".to_string())));
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().failed_blocks == 1).await;
    observer.clear();

    source.set_block_error(None);
    assert_eq!(model.retry_failed(), 1);

    // The retry repaints the block's cells; the renderer's next query
    // triggers the fresh fetch.
    assert_eq!(
        observer.cells_changed(),
        vec![GridEvent::CellsChanged { row: 0, column: 0, row_span: 100, column_span: 10 }]
    );
    assert!(matches!(model.block_status(0, 0), BlockStatus::Absent));

    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;
    assert_eq!(source.block_calls(), 2);
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), Some(json!(0)));

    // Nothing left to retry.
    assert_eq!(model.retry_failed(), 0);
}

#[tokio::test]
async fn test_failure_is_per_block() {
    let source = MockDataSource::new(meta(100, 250));
    let model = GridModel::new(source.clone());
    model.initialize(locator(), ":, :", meta(100, 250));

    source.set_block_error(Some(FetchError::OutOfRange("bad extent".to_string())));
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().failed_blocks == 1).await;

    source.set_block_error(None);
    assert_eq!(model.cell_value(GridRegion::Body, 0, 200), None);
    let m = model.clone();
    wait_until(move || m.stats().resolved_blocks == 1).await;

    assert!(matches!(model.block_status(0, 0), BlockStatus::Failed(FetchError::OutOfRange(_))));
    assert!(matches!(model.block_status(0, 200), BlockStatus::Resolved));
    assert_eq!(model.cell_value(GridRegion::Body, 0, 200), Some(json!(200)));
}

#[tokio::test]
async fn test_refresh_clears_failed_blocks() {
    let source = MockDataSource::new(meta(100, 10));
    let model = GridModel::new(source.clone());
    model.initialize(locator(), ":, :", meta(100, 10));

    source.set_block_error(Some(FetchError::NotFound("dataset moved".to_string())));
    assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
    let m = model.clone();
    wait_until(move || m.stats().failed_blocks == 1).await;

    model.refresh().await.unwrap();
    assert_eq!(model.stats().failed_blocks, 0);
    assert!(matches!(model.block_status(0, 0), BlockStatus::Absent));
}

#[tokio::test]
async fn test_dropping_the_model_discards_in_flight_work() {
    let source = MockDataSource::with_gated_blocks(meta(100, 10));
    let observer = RecordingObserver::new();
    {
        let model = GridModel::new(source.clone());
        model.subscribe(observer.clone());
        model.initialize(locator(), ":, :", meta(100, 10));
        observer.clear();

        assert_eq!(model.cell_value(GridRegion::Body, 0, 0), None);
        let s = source.clone();
        wait_until(move || s.block_calls() == 1).await;
    }

    // The model is gone; the completing fetch must be a silent no-op.
    source.release_blocks(1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(observer.notes().is_empty());
    assert_eq!(source.block_calls(), 1);
}
