//! Common types for the importer

use reel_core::types::{CatalogSnapshot, RecordStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event emitted on the import outcome stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportEvent {
    /// A record finished processing (imported, failed, or deleted)
    Record(RecordOutcome),

    /// Cumulative progress after a record finished
    Progress(ProgressTick),
}

/// Per-record result surfaced on the outcome stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// Source path identifying the record
    pub source_path: PathBuf,

    /// Status the record ended in
    pub status: RecordStatus,

    /// Destination path, when one was resolved
    pub dest_path: Option<PathBuf>,

    /// Error message for a failed record
    pub error: Option<String>,

    /// Non-fatal warning (e.g. source deletion failed)
    pub warning: Option<String>,
}

/// Monotonically increasing progress counters
///
/// Emitted after each completed record; `bytes_completed` counts only bytes
/// actually copied.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTick {
    /// Records processed so far
    pub files_completed: usize,

    /// Bytes copied so far
    pub bytes_completed: u64,
}

/// Summary of an import batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// Catalog with per-record statuses updated by this batch
    pub catalog: CatalogSnapshot,

    /// Records copied successfully
    pub imported: usize,

    /// Records that failed to copy
    pub failed: usize,

    /// Redundant source files removed (delete-originals mode)
    pub deleted_duplicates: usize,

    /// Whether the batch stopped early due to cancellation
    pub cancelled: bool,

    /// Duration of the batch
    pub duration_seconds: u64,
}

impl ImportOutcome {
    pub fn summary_text(&self) -> String {
        format!(
            "Import complete: {} imported, {} failed, {} duplicates removed{}",
            self.imported,
            self.failed,
            self.deleted_duplicates,
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}
