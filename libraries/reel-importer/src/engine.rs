//! Engine facade tying scanner, pipeline, and recalculation together
//!
//! Owns the catalog store and exposes the three entry points: scan, import
//! eligible records, and react to destination changes. All heavy work runs
//! on the blocking pool; only complete immutable snapshots cross back to
//! the caller.

use crate::catalog::CatalogStore;
use crate::equality::{ContentEquality, HeuristicEquality};
use crate::pipeline::ImportPipeline;
use crate::recalc::{RecalcState, RecalculationCoordinator};
use crate::scanner::Scanner;
use crate::types::{ImportEvent, ImportOutcome};
use crate::{ImportError, Result};
use reel_core::traits::{SettingsProvider, SourceProvider, ThumbnailProvider};
use reel_core::types::{CatalogSnapshot, DestinationSettings, MediaRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Media import engine
///
/// The engine is the single writer of its catalog store: scans, import
/// batches, and recalculations each publish a fresh snapshot when they
/// finish. Hosts observe the catalog through [`ImportEngine::current`] and
/// [`ImportEngine::subscribe`].
pub struct ImportEngine {
    scanner: Scanner,
    pipeline: ImportPipeline,
    store: Arc<CatalogStore>,
    coordinator: RecalculationCoordinator,
    thumbnails: Option<Arc<dyn ThumbnailProvider>>,
}

impl Default for ImportEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportEngine {
    /// Create an engine with the default scanner, pipeline, and the
    /// size/timestamp equality heuristic
    pub fn new() -> Self {
        Self::with_equality(Arc::new(HeuristicEquality::new()))
    }

    /// Create an engine with a specific content-equality strategy
    pub fn with_equality(equality: Arc<dyn ContentEquality>) -> Self {
        let store = Arc::new(CatalogStore::new());
        Self {
            scanner: Scanner::new().with_equality(equality.clone()),
            pipeline: ImportPipeline::new(),
            coordinator: RecalculationCoordinator::new(store.clone(), equality),
            store,
            thumbnails: None,
        }
    }

    /// Attach a thumbnail provider
    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailProvider>) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    /// Replace the scanner
    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Replace the import pipeline
    pub fn with_pipeline(mut self, pipeline: ImportPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// The most recently published catalog snapshot
    pub fn current(&self) -> Arc<CatalogSnapshot> {
        self.store.current()
    }

    /// Register for catalog change notifications
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<CatalogSnapshot>> {
        self.store.subscribe()
    }

    /// Current recalculation state
    pub fn recalc_state(&self) -> RecalcState {
        self.coordinator.state()
    }

    /// Scan a source tree and publish the resulting catalog
    ///
    /// # Errors
    ///
    /// Fails when the source root is missing or unreadable, or on
    /// cancellation; nothing is published in either case.
    pub async fn scan(
        &self,
        source_root: &Path,
        dest_root: Option<&Path>,
        settings: &DestinationSettings,
        cancel: CancellationToken,
    ) -> Result<Arc<CatalogSnapshot>> {
        let scanner = self.scanner.clone();
        let source_root = source_root.to_path_buf();
        let dest_root = dest_root.map(Path::to_path_buf);
        let settings = settings.clone();

        let snapshot = tokio::task::spawn_blocking(move || {
            scanner.scan(&source_root, dest_root.as_deref(), &settings, &cancel)
        })
        .await
        .map_err(|err| ImportError::Unknown(err.to_string()))??;

        self.store.publish(snapshot);
        Ok(self.store.current())
    }

    /// Scan using the host's source and settings providers
    pub async fn scan_from_providers(
        &self,
        source: &dyn SourceProvider,
        settings: &dyn SettingsProvider,
        cancel: CancellationToken,
    ) -> Result<Arc<CatalogSnapshot>> {
        let source_root = source.source_root().await?;
        let dest_root = settings.destination_root();
        self.scan(
            &source_root,
            dest_root.as_deref(),
            &settings.destination_settings(),
            cancel,
        )
        .await
    }

    /// Import all eligible records of the current catalog
    ///
    /// Returns the outcome event stream and a handle resolving to the batch
    /// summary. The summary's catalog is published to the store when the
    /// batch finishes, cancelled or not, so completed records keep their
    /// `imported` status.
    ///
    /// # Errors
    ///
    /// Fails up front when the destination root cannot be created or
    /// written.
    pub fn import_eligible(
        &self,
        dest_root: PathBuf,
        settings: DestinationSettings,
        cancel: CancellationToken,
    ) -> Result<(mpsc::Receiver<ImportEvent>, JoinHandle<Result<ImportOutcome>>)> {
        let catalog = self.store.current();
        let (rx, inner) =
            self.pipeline
                .run((*catalog).clone(), dest_root, settings, cancel)?;

        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            let outcome = inner
                .await
                .map_err(|err| ImportError::Unknown(err.to_string()))??;
            store.publish(outcome.catalog.clone());
            Ok(outcome)
        });

        Ok((rx, handle))
    }

    /// React to a destination change by recalculating the current catalog
    ///
    /// Any in-flight recalculation is cancelled and superseded. Returns
    /// `None` when the catalog is empty (nothing to recalculate).
    pub fn destination_changed(
        &self,
        dest_root: Option<PathBuf>,
        settings: DestinationSettings,
    ) -> Option<JoinHandle<()>> {
        self.coordinator.destination_changed(dest_root, settings)
    }

    /// Preview bytes for a record, when a thumbnail provider is attached
    pub fn thumbnail_for(&self, record: &MediaRecord) -> Option<Vec<u8>> {
        self.thumbnails.as_ref()?.thumbnail(record)
    }
}
