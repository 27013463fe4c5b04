//! Integration tests for scanning, classification, and duplicate detection

mod test_helpers;

use reel_core::types::{DestinationSettings, MediaType, RecordStatus};
use reel_importer::{ImportError, Scanner};
use std::path::{Path, PathBuf};
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

#[test]
fn test_classification_sidecars_and_skips() {
    init_tracing();
    let source = TempDir::new().unwrap();
    write_file(source.path(), "DCIM/clip.MOV", b"video bytes");
    write_file(source.path(), "DCIM/CLIP.THM", b"thumb");
    write_file(source.path(), "DCIM/photo.jpg", b"image bytes");
    write_file(source.path(), "DCIM/notes.txt", b"not media");
    write_file(source.path(), ".thumbnails/cache.jpg", b"cache");

    let catalog = Scanner::new()
        .scan(
            source.path(),
            None,
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(catalog.len(), 2);

    let clip = catalog
        .get(&source.path().join("DCIM/clip.MOV"))
        .expect("clip record");
    assert_eq!(clip.media_type, MediaType::Video);
    assert_eq!(clip.status, RecordStatus::Waiting);
    assert_eq!(
        clip.sidecar_paths,
        vec![source.path().join("DCIM/CLIP.THM")]
    );

    let photo = catalog
        .get(&source.path().join("DCIM/photo.jpg"))
        .expect("photo record");
    assert_eq!(photo.media_type, MediaType::Image);
    assert!(photo.sidecar_paths.is_empty());
    // No embedded capture date, so the filesystem mtime is used
    assert_eq!(photo.captured_at, photo.modified_at);
}

#[test]
fn test_scan_is_idempotent() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    write_file(source.path(), "a.jpg", b"aaaa");
    write_file(source.path(), "b.mov", b"bbbbbb");

    let scanner = Scanner::new();
    let first = scanner
        .scan(
            source.path(),
            Some(dest.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();
    let second = scanner
        .scan(
            source.path(),
            Some(dest.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_duplicate_in_source() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let content = vec![7u8; 1024];
    let a = write_file(source.path(), "a.jpg", &content);
    let b = write_file(source.path(), "b.jpg", &content);
    set_mtime(&a, 1_700_000_000);
    set_mtime(&b, 1_700_000_005);

    let catalog = Scanner::new()
        .scan(
            source.path(),
            None,
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    let a_record = catalog.get(&a).unwrap();
    assert_eq!(a_record.status, RecordStatus::Waiting);
    assert!(a_record.duplicate_of.is_none());

    let b_record = catalog.get(&b).unwrap();
    assert_eq!(b_record.status, RecordStatus::DuplicateInSource);
    assert_eq!(b_record.duplicate_of, Some(a.clone()));
}

#[test]
fn test_pre_existing_at_destination() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let src = write_file(source.path(), "photo.jpg", b"identical bytes");
    let existing = write_file(dest.path(), "photo.jpg", b"identical bytes");
    set_mtime(&src, 1_700_000_000);
    set_mtime(&existing, 1_700_000_010);

    let catalog = Scanner::new()
        .scan(
            source.path(),
            Some(dest.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    let record = catalog.get(&src).unwrap();
    assert_eq!(record.status, RecordStatus::PreExisting);
    // No suffix allocated: the destination is the pre-existing file itself
    assert_eq!(record.dest_path, Some(existing));
}

#[test]
fn test_collision_allocates_next_free_suffix() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    // Distinct sizes guarantee distinct content under any strategy
    let src = write_file(source.path(), "clip.mov", b"content Z..");
    write_file(dest.path(), "clip.mov", b"content X");
    write_file(dest.path(), "clip_1.mov", b"content Y.");

    let catalog = Scanner::new()
        .scan(
            source.path(),
            Some(dest.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    let record = catalog.get(&src).unwrap();
    assert_eq!(record.status, RecordStatus::Waiting);
    assert_eq!(record.dest_path, Some(dest.path().join("clip_2.mov")));
}

#[test]
fn test_same_basename_sources_get_deterministic_suffixes() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let first = write_file(source.path(), "a/clip.mov", b"first clip");
    let second = write_file(source.path(), "b/clip.mov", b"second clip.");

    let catalog = Scanner::new()
        .scan(
            source.path(),
            Some(dest.path()),
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    // Suffixes ascend in source-path lexicographic order
    assert_eq!(
        catalog.get(&first).unwrap().dest_path,
        Some(dest.path().join("clip.mov"))
    );
    assert_eq!(
        catalog.get(&second).unwrap().dest_path,
        Some(dest.path().join("clip_1.mov"))
    );
}

#[test]
fn test_disabled_categories_are_excluded() {
    init_tracing();
    let source = TempDir::new().unwrap();
    write_file(source.path(), "photo.jpg", b"image");
    write_file(source.path(), "memo.wav", b"audio");

    let settings = DestinationSettings {
        enabled_types: [MediaType::Image].into_iter().collect(),
        ..flat_settings()
    };
    let catalog = Scanner::new()
        .scan(source.path(), None, &settings, &CancellationToken::new())
        .unwrap();

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.records()[0].media_type, MediaType::Image);
}

#[test]
fn test_organized_and_renamed_destination() {
    init_tracing();
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let src = write_file(source.path(), "DSC01.JPEG", b"image bytes");
    // 2024-07-09 14:30:05 UTC
    set_mtime(&src, 1_720_535_405);

    let settings = DestinationSettings {
        organize_by_date: true,
        rename_by_date: true,
        ..DestinationSettings::default()
    };
    let catalog = Scanner::new()
        .scan(
            source.path(),
            Some(dest.path()),
            &settings,
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(
        catalog.get(&src).unwrap().dest_path,
        Some(dest.path().join("2024/07/IMG_20240709_143005.jpg"))
    );
}

#[test]
fn test_missing_source_root() {
    init_tracing();
    let result = Scanner::new().scan(
        Path::new("/nonexistent/card"),
        None,
        &flat_settings(),
        &CancellationToken::new(),
    );
    assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
}

#[test]
fn test_cancelled_scan_returns_early() {
    init_tracing();
    let source = TempDir::new().unwrap();
    write_file(source.path(), "a.jpg", b"aaaa");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = Scanner::new().scan(source.path(), None, &flat_settings(), &cancel);
    assert!(matches!(result, Err(ImportError::Cancelled)));
}

#[test]
fn test_records_sorted_by_source_path() {
    init_tracing();
    let source = TempDir::new().unwrap();
    write_file(source.path(), "z.jpg", b"zz");
    write_file(source.path(), "a.jpg", b"aa");
    write_file(source.path(), "m.mov", b"mm");

    let catalog = Scanner::new()
        .scan(
            source.path(),
            None,
            &flat_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

    let paths: Vec<PathBuf> = catalog
        .records()
        .iter()
        .map(|r| r.source_path.clone())
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}
