//! Reel Core
//!
//! Platform-agnostic domain types, traits, and error handling for the Reel
//! media import engine.
//!
//! This crate provides the foundational building blocks shared by the engine
//! and by any host embedding it:
//!
//! - **Domain Types**: `MediaRecord`, `CatalogSnapshot`, `DestinationSettings`
//! - **Collaborator Traits**: `SourceProvider`, `SettingsProvider`,
//!   `ThumbnailProvider`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use reel_core::types::{CatalogSnapshot, DestinationSettings, MediaType};
//!
//! let settings = DestinationSettings::default();
//! assert!(settings.is_enabled(MediaType::Image));
//!
//! let catalog = CatalogSnapshot::empty();
//! assert!(catalog.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use traits::{SettingsProvider, SourceProvider, ThumbnailProvider};
pub use types::{
    CatalogSnapshot, DestinationSettings, MediaRecord, MediaType, RecordStatus,
};
