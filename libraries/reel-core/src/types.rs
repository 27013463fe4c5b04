//! Domain types for the media import engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Media category of a cataloged file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Still images (JPEG, HEIC, RAW formats, ...)
    Image,

    /// Video clips
    Video,

    /// Audio recordings (voice memos and the like)
    Audio,

    /// Not recognized as media; excluded from catalogs
    Unknown,
}

impl MediaType {
    /// Filename prefix used when renaming by capture date
    pub fn filename_prefix(&self) -> &'static str {
        match self {
            MediaType::Image => "IMG",
            MediaType::Video => "VID",
            MediaType::Audio => "AUD",
            MediaType::Unknown => "FILE",
        }
    }
}

/// Lifecycle status of a cataloged record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Eligible for import; destination slot resolved (or pending resolution)
    Waiting,

    /// Identical content already present at the computed destination path
    PreExisting,

    /// Identical content already seen earlier in the same source scan
    DuplicateInSource,

    /// Copy in flight
    Copying,

    /// Copied to the destination successfully
    Imported,

    /// Redundant source file removed after import (delete-originals mode)
    DeletedAsDuplicate,

    /// Copy failed; see `last_error` on the record
    Failed,
}

impl RecordStatus {
    /// Whether a record with this status is eligible for the copy pipeline
    pub fn is_eligible(&self) -> bool {
        matches!(self, RecordStatus::Waiting)
    }

    /// Whether this status represents redundant content (already at the
    /// destination, or a repeat within the source)
    pub fn is_redundant(&self) -> bool {
        matches!(
            self,
            RecordStatus::PreExisting | RecordStatus::DuplicateInSource
        )
    }
}

/// A single media file discovered in the source tree
///
/// Identity is the source path, unique within a snapshot. `source_path`,
/// `media_type`, `captured_at`, `modified_at`, `byte_size`, and
/// `sidecar_paths` are fixed at scan time; only `dest_path`, `status`,
/// `duplicate_of`, `last_error`, and `warning` are ever recomputed, and
/// always on a fresh snapshot copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Absolute path of the file in the source tree (record identity)
    pub source_path: PathBuf,

    /// Media category derived from the file extension
    pub media_type: MediaType,

    /// Capture date from embedded metadata, else filesystem mtime (UTC)
    pub captured_at: DateTime<Utc>,

    /// Filesystem modification time (UTC), used by the equality heuristic
    pub modified_at: DateTime<Utc>,

    /// File size in bytes
    pub byte_size: u64,

    /// Auxiliary files sharing this file's basename (thumbnails, XMP, ...)
    pub sidecar_paths: Vec<PathBuf>,

    /// Resolved destination path, once a destination root is known
    pub dest_path: Option<PathBuf>,

    /// Current lifecycle status
    pub status: RecordStatus,

    /// Source path of the first-seen identical record, when this one is a
    /// duplicate within the source
    pub duplicate_of: Option<PathBuf>,

    /// Error message from the last failed import attempt
    pub last_error: Option<String>,

    /// Non-fatal warning (e.g. source deletion failed after a good copy)
    pub warning: Option<String>,
}

impl MediaRecord {
    /// Create a new record in `Waiting` state with no destination resolved
    pub fn new(
        source_path: impl Into<PathBuf>,
        media_type: MediaType,
        captured_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        byte_size: u64,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            media_type,
            captured_at,
            modified_at,
            byte_size,
            sidecar_paths: Vec::new(),
            dest_path: None,
            status: RecordStatus::Waiting,
            duplicate_of: None,
            last_error: None,
            warning: None,
        }
    }

    /// The record's identity within a snapshot
    pub fn id(&self) -> &Path {
        &self.source_path
    }
}

/// An ordered, immutable view of the scanned source
///
/// Snapshots are published wholesale on every mutation; readers never
/// observe a partially-updated catalog. Records are kept in lexicographic
/// source-path order, which also fixes duplicate/collision processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    records: Vec<MediaRecord>,
}

impl CatalogSnapshot {
    /// Build a snapshot, sorting records into canonical source-path order
    pub fn new(mut records: Vec<MediaRecord>) -> Self {
        records.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Self { records }
    }

    /// An empty snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// All records, in source-path order
    pub fn records(&self) -> &[MediaRecord] {
        &self.records
    }

    /// Number of records in the snapshot
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by its source path
    pub fn get(&self, source_path: &Path) -> Option<&MediaRecord> {
        self.records
            .binary_search_by(|r| r.source_path.as_path().cmp(source_path))
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Records eligible for the copy pipeline (`Waiting` status)
    pub fn eligible(&self) -> impl Iterator<Item = &MediaRecord> {
        self.records.iter().filter(|r| r.status.is_eligible())
    }

    /// Total byte size of eligible records
    pub fn eligible_bytes(&self) -> u64 {
        self.eligible().map(|r| r.byte_size).sum()
    }
}

/// User-facing import settings
///
/// The destination root itself travels separately through the engine API so
/// that destination changes can be recalculated without touching settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSettings {
    /// Organize copies into `YYYY/MM` directories (UTC capture date)
    pub organize_by_date: bool,

    /// Rename copies to `PREFIX_YYYYMMDD_HHMMSS` from the capture date
    pub rename_by_date: bool,

    /// Delete source files (and sidecars) after a successful import
    pub delete_originals: bool,

    /// Media categories included in scans
    pub enabled_types: BTreeSet<MediaType>,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            organize_by_date: true,
            rename_by_date: false,
            delete_originals: false,
            enabled_types: [MediaType::Image, MediaType::Video, MediaType::Audio]
                .into_iter()
                .collect(),
        }
    }
}

impl DestinationSettings {
    /// Whether the given media category is included in scans
    pub fn is_enabled(&self, media_type: MediaType) -> bool {
        self.enabled_types.contains(&media_type)
    }
}
