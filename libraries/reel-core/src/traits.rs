//! Collaborator traits for the media import engine
//!
//! The engine itself never discovers volumes, persists preferences, or
//! renders previews; hosts supply those capabilities through these traits.

use crate::error::Result;
use crate::types::{DestinationSettings, MediaRecord};
use async_trait::async_trait;
use std::path::PathBuf;

/// Supplies the directory to scan (typically the mount point of a removable
/// volume)
///
/// Resolution is async because volume discovery usually is.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// The root directory of the source tree to catalog
    ///
    /// # Errors
    /// Returns an error if no source volume is currently available
    async fn source_root(&self) -> Result<PathBuf>;
}

/// Supplies the user's import preferences
pub trait SettingsProvider: Send + Sync {
    /// The destination root, if one has been chosen yet
    fn destination_root(&self) -> Option<PathBuf>;

    /// The current destination settings (flags and enabled categories)
    fn destination_settings(&self) -> DestinationSettings;
}

/// Optionally supplies preview bytes for a record
///
/// Thumbnails are presentation-only; catalog correctness never depends on
/// this trait and hosts may omit it entirely.
pub trait ThumbnailProvider: Send + Sync {
    /// Encoded preview image bytes for the record, if one can be produced
    fn thumbnail(&self, record: &MediaRecord) -> Option<Vec<u8>>;
}
