//! Destination path resolution
//!
//! Pure mapping from a record plus naming settings (and an optional
//! collision suffix) to a destination path. No filesystem access happens
//! here; probing and suffix allocation live in the scanner.

use reel_core::types::{DestinationSettings, MediaRecord};
use std::path::{Path, PathBuf};

/// Extension aliases collapsed to a canonical spelling
///
/// Extensions are lowercased first; anything not listed here passes through
/// unchanged. HEIC keeps its modern extension.
const EXTENSION_ALIASES: &[(&str, &str)] = &[("jpeg", "jpg"), ("heif", "heic")];

/// Resolve the destination path for a record
///
/// Directory component is `YYYY/MM` (UTC capture date) when organizing by
/// date. Filename is `PREFIX_YYYYMMDD_HHMMSS` when renaming by date, else
/// the original stem. A numeric suffix, when present, lands immediately
/// before the extension. The capture date was fixed at scan time and is
/// never re-derived here.
pub fn resolve_destination(
    record: &MediaRecord,
    dest_root: &Path,
    settings: &DestinationSettings,
    suffix: Option<u32>,
) -> PathBuf {
    let mut path = dest_root.to_path_buf();

    if settings.organize_by_date {
        path.push(record.captured_at.format("%Y").to_string());
        path.push(record.captured_at.format("%m").to_string());
    }

    let stem = if settings.rename_by_date {
        format!(
            "{}_{}",
            record.media_type.filename_prefix(),
            record.captured_at.format("%Y%m%d_%H%M%S")
        )
    } else {
        record
            .source_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string()
    };

    let stem = match suffix {
        Some(n) => format!("{}_{}", stem, n),
        None => stem,
    };

    let filename = match normalized_extension(&record.source_path) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    };

    path.push(filename);
    path
}

/// Lowercase an extension and collapse known aliases
pub fn normalized_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    for (alias, canonical) in EXTENSION_ALIASES {
        if ext == *alias {
            return Some((*canonical).to_string());
        }
    }
    Some(ext)
}
