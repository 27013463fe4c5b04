//! Integration tests for destination-change recalculation

mod test_helpers;

use chrono::Utc;
use reel_core::types::{
    CatalogSnapshot, DestinationSettings, MediaRecord, MediaType, RecordStatus,
};
use reel_importer::recalc::recalculate;
use reel_importer::{
    CatalogStore, HeuristicEquality, ImportError, RecalcState, RecalculationCoordinator,
    Scanner,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use test_helpers::{init_tracing, set_mtime, write_file};
use tokio_util::sync::CancellationToken;

fn flat_settings() -> DestinationSettings {
    DestinationSettings {
        organize_by_date: false,
        rename_by_date: false,
        ..DestinationSettings::default()
    }
}

fn scan(source: &TempDir, dest: Option<&TempDir>) -> reel_core::types::CatalogSnapshot {
    Scanner::new()
        .scan(
            source.path(),
            dest.map(|d| d.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap()
}

#[test]
fn test_recalculation_moves_pre_existing_to_waiting() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest_a = TempDir::new().unwrap();
    let dest_b = TempDir::new().unwrap();
    let src = write_file(source.path(), "photo.jpg", b"identical bytes");
    let existing = write_file(dest_a.path(), "photo.jpg", b"identical bytes");
    set_mtime(&src, 1_700_000_000);
    set_mtime(&existing, 1_700_000_010);

    let catalog = scan(&source, Some(&dest_a));
    let record = catalog.get(&src).unwrap();
    assert_eq!(record.status, RecordStatus::PreExisting);

    let recalculated = recalculate(
        &catalog,
        Some(dest_b.path()),
        &flat_settings(),
        &HeuristicEquality::new(),
        &CancellationToken::new(),
    )
    .unwrap();

    let moved = recalculated.get(&src).unwrap();
    assert_eq!(moved.status, RecordStatus::Waiting);
    assert_eq!(moved.dest_path, Some(dest_b.path().join("photo.jpg")));
}

#[test]
fn test_recalculation_never_touches_scan_time_fields() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "clip.mov", b"video bytes");
    write_file(source.path(), "CLIP.THM", b"thumb");

    let before = scan(&source, None);
    let after = recalculate(
        &before,
        Some(dest.path()),
        &flat_settings(),
        &HeuristicEquality::new(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(before.len(), after.len());
    for (a, b) in before.records().iter().zip(after.records()) {
        assert_eq!(a.source_path, b.source_path);
        assert_eq!(a.sidecar_paths, b.sidecar_paths);
        assert_eq!(a.media_type, b.media_type);
        assert_eq!(a.captured_at, b.captured_at);
    }
}

#[test]
fn test_recalculation_without_destination_clears_paths() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let content = vec![9u8; 256];
    let a = write_file(source.path(), "a.jpg", &content);
    let b = write_file(source.path(), "b.jpg", &content);
    set_mtime(&a, 1_700_000_000);
    set_mtime(&b, 1_700_000_005);

    let catalog = scan(&source, Some(&dest));
    let recalculated = recalculate(
        &catalog,
        None,
        &flat_settings(),
        &HeuristicEquality::new(),
        &CancellationToken::new(),
    )
    .unwrap();

    let a_record = recalculated.get(&a).unwrap();
    assert_eq!(a_record.status, RecordStatus::Waiting);
    assert_eq!(a_record.dest_path, None);

    // In-source duplicates are destination-independent and keep their status
    let b_record = recalculated.get(&b).unwrap();
    assert_eq!(b_record.status, RecordStatus::DuplicateInSource);
    assert_eq!(b_record.duplicate_of, Some(a.clone()));
}

#[test]
fn test_recalculation_preserves_error_fields() {
    init_tracing();
    let dest = TempDir::new().unwrap();
    let mut record = MediaRecord::new(
        "/gone/photo.jpg",
        MediaType::Image,
        Utc::now(),
        Utc::now(),
        64,
    );
    record.status = RecordStatus::Failed;
    record.last_error = Some("disk full".to_string());
    record.warning = Some("delete failed earlier".to_string());
    let catalog = CatalogSnapshot::new(vec![record]);

    let recalculated = recalculate(
        &catalog,
        Some(dest.path()),
        &flat_settings(),
        &HeuristicEquality::new(),
        &CancellationToken::new(),
    )
    .unwrap();

    // Re-probing may change the destination and status, nothing else
    let record = recalculated.get(Path::new("/gone/photo.jpg")).unwrap();
    assert_eq!(record.status, RecordStatus::Waiting);
    assert_eq!(record.dest_path, Some(dest.path().join("photo.jpg")));
    assert_eq!(record.last_error.as_deref(), Some("disk full"));
    assert_eq!(record.warning.as_deref(), Some("delete failed earlier"));
}

#[test]
fn test_pre_cancelled_recalculation() {
    init_tracing();
    let source = TempDir::new().unwrap();
    write_file(source.path(), "a.jpg", b"aaaa");
    let catalog = scan(&source, None);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = recalculate(
        &catalog,
        None,
        &flat_settings(),
        &HeuristicEquality::new(),
        &cancel,
    );
    assert!(matches!(result, Err(ImportError::Cancelled)));
}

#[tokio::test]
async fn test_coordinator_publishes_recalculated_snapshot() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest_b = TempDir::new().unwrap();
    let src = write_file(source.path(), "photo.jpg", b"image bytes");

    let store = Arc::new(CatalogStore::new());
    store.publish(scan(&source, None));
    let coordinator =
        RecalculationCoordinator::new(store.clone(), Arc::new(HeuristicEquality::new()));
    assert_eq!(coordinator.state(), RecalcState::Idle);

    let handle = coordinator
        .destination_changed(Some(dest_b.path().to_path_buf()), flat_settings())
        .expect("non-empty catalog starts a recalculation");
    handle.await.unwrap();

    assert_eq!(coordinator.state(), RecalcState::Idle);
    let current = store.current();
    assert_eq!(
        current.get(&src).unwrap().dest_path,
        Some(dest_b.path().join("photo.jpg"))
    );
}

#[tokio::test]
async fn test_coordinator_ignores_empty_catalog() {
    init_tracing();
    let store = Arc::new(CatalogStore::new());
    let coordinator =
        RecalculationCoordinator::new(store, Arc::new(HeuristicEquality::new()));
    assert!(coordinator
        .destination_changed(None, flat_settings())
        .is_none());
    assert_eq!(coordinator.state(), RecalcState::Idle);
}

#[tokio::test]
async fn test_newest_destination_change_wins() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest_a = TempDir::new().unwrap();
    let dest_b = TempDir::new().unwrap();
    let src = write_file(source.path(), "photo.jpg", b"image bytes");

    let store = Arc::new(CatalogStore::new());
    store.publish(scan(&source, None));
    let coordinator =
        RecalculationCoordinator::new(store.clone(), Arc::new(HeuristicEquality::new()));

    let first = coordinator
        .destination_changed(Some(dest_a.path().to_path_buf()), flat_settings())
        .unwrap();
    let second = coordinator
        .destination_changed(Some(dest_b.path().to_path_buf()), flat_settings())
        .unwrap();
    first.await.unwrap();
    second.await.unwrap();

    // Regardless of completion order, the catalog reflects the newest
    // destination
    assert_eq!(
        store.current().get(&src).unwrap().dest_path,
        Some(dest_b.path().join("photo.jpg"))
    );
    assert_eq!(coordinator.state(), RecalcState::Idle);
}
