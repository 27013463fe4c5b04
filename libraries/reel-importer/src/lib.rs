//! # Reel Importer
//!
//! Local-filesystem media import engine: scans a source tree (camera card,
//! phone mount) into an immutable catalog, detects duplicate and
//! pre-existing content, resolves destination paths with date organizing
//! and collision suffixes, and copies eligible records with progress
//! reporting and cooperative cancellation.
//!
//! ## Example
//!
//! ```no_run
//! use reel_importer::ImportEngine;
//! use reel_core::types::DestinationSettings;
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> reel_importer::Result<()> {
//! let engine = ImportEngine::new();
//! let settings = DestinationSettings::default();
//!
//! let catalog = engine
//!     .scan(
//!         Path::new("/mnt/card/DCIM"),
//!         Some(Path::new("/home/user/Pictures")),
//!         &settings,
//!         CancellationToken::new(),
//!     )
//!     .await?;
//! println!("{} files eligible", catalog.eligible().count());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod engine;
pub mod equality;
pub mod error;
pub mod pipeline;
pub mod recalc;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use catalog::CatalogStore;
pub use engine::ImportEngine;
pub use equality::{ContentEquality, DigestEquality, FileSig, HeuristicEquality};
pub use error::ImportError;
pub use pipeline::ImportPipeline;
pub use recalc::{RecalcState, RecalculationCoordinator};
pub use scanner::{ScanConfig, Scanner};
pub use types::{ImportEvent, ImportOutcome, ProgressTick, RecordOutcome};

/// Result type for importer operations
pub type Result<T> = std::result::Result<T, ImportError>;
