//! Destination-change recalculation
//!
//! When the destination root changes, destination paths and statuses of the
//! existing catalog are re-resolved against the new root without re-walking
//! the source tree. The coordinator keeps at most one recalculation in
//! flight; a newer destination change cancels and supersedes an older one,
//! and a superseded result is discarded without ever being published.

use crate::catalog::CatalogStore;
use crate::equality::ContentEquality;
use crate::scanner::allocate_destination;
use crate::{ImportError, Result};
use reel_core::types::{CatalogSnapshot, DestinationSettings, RecordStatus};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Re-resolve destination paths and statuses against a new destination root
///
/// Only `dest_path` and `status` change here; every other field, including
/// `last_error` and `warning`, rides through untouched. In-source
/// duplicates keep their status and `duplicate_of`; duplicate detection
/// depends only on source content. Every other record is re-probed with
/// the same logic the scanner uses, ending `Waiting` or `PreExisting`.
/// Without a destination root, records revert to `Waiting` with no
/// destination.
pub fn recalculate(
    catalog: &CatalogSnapshot,
    dest_root: Option<&Path>,
    settings: &DestinationSettings,
    equality: &dyn ContentEquality,
    cancel: &CancellationToken,
) -> Result<CatalogSnapshot> {
    let mut records = catalog.records().to_vec();
    let mut claimed = HashSet::new();

    for record in records.iter_mut() {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        if record.status == RecordStatus::DuplicateInSource {
            continue;
        }

        match dest_root {
            Some(root) => {
                let (dest, status) =
                    allocate_destination(record, root, settings, equality, &claimed)?;
                claimed.insert(dest.clone());
                record.dest_path = Some(dest);
                record.status = status;
            }
            None => {
                record.dest_path = None;
                record.status = RecordStatus::Waiting;
            }
        }
    }

    Ok(CatalogSnapshot::new(records))
}

/// Coordinator state, observable for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcState {
    /// No recalculation in flight
    Idle,
    /// A recalculation is running against the latest destination
    Recalculating,
}

struct Flight {
    generation: u64,
    cancel: CancellationToken,
}

/// Serializes destination-change recalculations over a catalog store
///
/// Last writer wins by request generation: a newer `destination_changed`
/// call cancels the in-flight recalculation, and a stale result that loses
/// the generation check is never published.
pub struct RecalculationCoordinator {
    store: Arc<CatalogStore>,
    equality: Arc<dyn ContentEquality>,
    flight: Arc<Mutex<Option<Flight>>>,
    generation: AtomicU64,
}

impl RecalculationCoordinator {
    pub fn new(store: Arc<CatalogStore>, equality: Arc<dyn ContentEquality>) -> Self {
        Self {
            store,
            equality,
            flight: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Current coordinator state
    pub fn state(&self) -> RecalcState {
        if self
            .flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            RecalcState::Recalculating
        } else {
            RecalcState::Idle
        }
    }

    /// React to a destination change
    ///
    /// Cancels any in-flight recalculation and starts a new one against the
    /// current catalog. A destination change with an empty catalog is a
    /// no-op and returns `None`. The returned handle resolves when this
    /// request either published its snapshot or was superseded.
    pub fn destination_changed(
        &self,
        dest_root: Option<PathBuf>,
        settings: DestinationSettings,
    ) -> Option<JoinHandle<()>> {
        let catalog = self.store.current();
        if catalog.is_empty() {
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        {
            let mut flight = self.flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = flight.take() {
                tracing::debug!(
                    "Superseding recalculation generation {}",
                    previous.generation
                );
                previous.cancel.cancel();
            }
            *flight = Some(Flight {
                generation,
                cancel: cancel.clone(),
            });
        }

        let store = self.store.clone();
        let equality = self.equality.clone();
        let flight = self.flight.clone();

        Some(tokio::task::spawn_blocking(move || {
            let result = recalculate(
                &catalog,
                dest_root.as_deref(),
                &settings,
                equality.as_ref(),
                &cancel,
            );

            let mut flight = flight.lock().unwrap_or_else(PoisonError::into_inner);
            let current = flight.as_ref().map(|f| f.generation) == Some(generation);

            match result {
                Ok(snapshot) if current => {
                    store.publish(snapshot);
                    *flight = None;
                }
                Ok(_) | Err(ImportError::Cancelled) => {
                    // Superseded; discard silently, the newer request owns
                    // the flight slot.
                    tracing::debug!("Discarding superseded recalculation {}", generation);
                }
                Err(err) => {
                    tracing::error!("Recalculation failed: {}", err);
                    if current {
                        *flight = None;
                    }
                }
            }
        }))
    }
}
