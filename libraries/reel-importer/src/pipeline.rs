//! Streaming copy pipeline
//!
//! Copies eligible records to their resolved destinations one at a time,
//! emitting a per-record outcome and a cumulative progress tick after each.
//! Copies go through a `.partial` temporary in the final directory and are
//! renamed into place only when complete, so a crash or cancellation never
//! leaves a half-written file under a final name.

use crate::types::{ImportEvent, ImportOutcome, ProgressTick, RecordOutcome};
use crate::{ImportError, Result};
use filetime::FileTime;
use reel_core::types::{CatalogSnapshot, DestinationSettings, MediaRecord, RecordStatus};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default copy chunk size (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome-stream channel capacity
const EVENT_CHANNEL_SIZE: usize = 100;

/// Streaming import pipeline
#[derive(Debug, Clone)]
pub struct ImportPipeline {
    chunk_size: usize,
    preserve_timestamps: bool,
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportPipeline {
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            preserve_timestamps: true,
        }
    }

    /// Set the copy chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set whether copied files keep the source modification time
    pub fn with_preserve_timestamps(mut self, preserve: bool) -> Self {
        self.preserve_timestamps = preserve;
        self
    }

    /// Run an import batch over the eligible records of a catalog
    ///
    /// Returns the outcome event stream and a handle resolving to the batch
    /// summary, whose catalog carries the per-record statuses this batch
    /// produced. Per-record failures are reported on the stream and in the
    /// summary; only systemic conditions fail the batch itself.
    ///
    /// # Errors
    ///
    /// Fails up front when the destination root cannot be created or written.
    pub fn run(
        &self,
        catalog: CatalogSnapshot,
        dest_root: PathBuf,
        settings: DestinationSettings,
        cancel: CancellationToken,
    ) -> Result<(mpsc::Receiver<ImportEvent>, JoinHandle<Result<ImportOutcome>>)> {
        ensure_destination_writable(&dest_root)?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let pipeline = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            pipeline.run_blocking(catalog, &settings, &cancel, &tx)
        });

        Ok((rx, handle))
    }

    fn run_blocking(
        &self,
        catalog: CatalogSnapshot,
        settings: &DestinationSettings,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ImportEvent>,
    ) -> Result<ImportOutcome> {
        let started = Instant::now();
        let mut records: Vec<MediaRecord> = catalog.records().to_vec();
        let mut progress = ProgressTick::default();
        let mut imported = 0;
        let mut failed = 0;
        let mut deleted_duplicates = 0;
        let mut cancelled = false;

        for record in records.iter_mut() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let processed = if record.status.is_eligible() && record.dest_path.is_some() {
                record.status = RecordStatus::Copying;
                match self.copy_record(record, cancel) {
                    Ok(()) => {
                        record.status = RecordStatus::Imported;
                        imported += 1;
                        progress.bytes_completed += record.byte_size;
                        if settings.delete_originals {
                            remove_source(record);
                        }
                        true
                    }
                    Err(ImportError::Cancelled) => {
                        // Mid-copy cancellation; the partial was removed and
                        // the record is still importable next time.
                        record.status = RecordStatus::Waiting;
                        cancelled = true;
                        break;
                    }
                    Err(err) => {
                        tracing::error!(
                            "Failed to import {}: {}",
                            record.source_path.display(),
                            err
                        );
                        record.status = RecordStatus::Failed;
                        record.last_error = Some(err.to_string());
                        failed += 1;
                        true
                    }
                }
            } else if record.status.is_redundant() && settings.delete_originals {
                remove_source(record);
                if record.status == RecordStatus::DeletedAsDuplicate {
                    deleted_duplicates += 1;
                }
                true
            } else {
                false
            };

            if processed {
                progress.files_completed += 1;
                let _ = tx.blocking_send(ImportEvent::Record(RecordOutcome {
                    source_path: record.source_path.clone(),
                    status: record.status,
                    dest_path: record.dest_path.clone(),
                    error: record.last_error.clone(),
                    warning: record.warning.clone(),
                }));
                let _ = tx.blocking_send(ImportEvent::Progress(progress));
            }
        }

        let outcome = ImportOutcome {
            catalog: CatalogSnapshot::new(records),
            imported,
            failed,
            deleted_duplicates,
            cancelled,
            duration_seconds: started.elapsed().as_secs(),
        };
        tracing::info!("{}", outcome.summary_text());
        Ok(outcome)
    }

    /// Copy a record and its sidecars to the resolved destination
    ///
    /// A sidecar copy failure never fails the record; it is attached as a
    /// warning alongside the otherwise-successful copy.
    fn copy_record(&self, record: &mut MediaRecord, cancel: &CancellationToken) -> Result<()> {
        let dest = record
            .dest_path
            .as_ref()
            .ok_or_else(|| {
                ImportError::InvalidPath(format!(
                    "{} has no resolved destination",
                    record.source_path.display()
                ))
            })?
            .clone();

        self.copy_file(&record.source_path, &dest, cancel)?;

        let mut warning = None;
        for sidecar in &record.sidecar_paths {
            let ext = sidecar
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();
            let sidecar_dest = dest.with_extension(ext);
            if let Err(err) = self.copy_file(sidecar, &sidecar_dest, cancel) {
                if matches!(err, ImportError::Cancelled) {
                    return Err(err);
                }
                tracing::warn!(
                    "Failed to copy sidecar {}: {}",
                    sidecar.display(),
                    err
                );
                warning = Some(format!(
                    "Failed to copy sidecar {}: {}",
                    sidecar.display(),
                    err
                ));
            }
        }
        if warning.is_some() {
            record.warning = warning;
        }

        Ok(())
    }

    /// Copy one file through a `.partial` temporary in the final directory
    fn copy_file(&self, source: &Path, dest: &Path, cancel: &CancellationToken) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = partial_path(dest);

        // Snapshot timestamps before the copy loop touches the source's
        // access time. Creation time is not portably settable and is left
        // to the filesystem.
        let source_times = if self.preserve_timestamps {
            fs::metadata(source).ok().map(|meta| {
                (
                    FileTime::from_last_access_time(&meta),
                    FileTime::from_last_modification_time(&meta),
                )
            })
        } else {
            None
        };

        match self.copy_chunks(source, &partial, cancel) {
            Ok(()) => {
                if let Some((atime, mtime)) = source_times {
                    let _ = filetime::set_file_times(&partial, atime, mtime);
                }
                fs::rename(&partial, dest)?;
                tracing::debug!("Copied {} -> {}", source.display(), dest.display());
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&partial);
                Err(err)
            }
        }
    }

    fn copy_chunks(
        &self,
        source: &Path,
        partial: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut reader = BufReader::with_capacity(self.chunk_size, File::open(source)?);
        let mut writer = File::create(partial)?;
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read])?;
        }
        writer.sync_all()?;
        Ok(())
    }
}

/// Delete a redundant source file and its sidecars
///
/// Failures downgrade to a warning on the record; a source that cannot be
/// deleted never fails the batch. Once the primary file is gone, a
/// redundant record is `deleted_as_duplicate` even if a sidecar lingers.
fn remove_source(record: &mut MediaRecord) {
    if let Err(err) = fs::remove_file(&record.source_path) {
        tracing::warn!(
            "Failed to delete {}: {}",
            record.source_path.display(),
            err
        );
        record.warning = Some(format!(
            "Failed to delete {}: {}",
            record.source_path.display(),
            err
        ));
        return;
    }

    let mut warning = None;
    for sidecar in &record.sidecar_paths {
        if let Err(err) = fs::remove_file(sidecar) {
            tracing::warn!("Failed to delete {}: {}", sidecar.display(), err);
            warning = Some(format!("Failed to delete {}: {}", sidecar.display(), err));
        }
    }
    if warning.is_some() {
        record.warning = warning;
    }

    if record.status.is_redundant() {
        record.status = RecordStatus::DeletedAsDuplicate;
    }
}

/// Temporary path used while a copy is in flight
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

/// Verify the destination root exists (creating it if needed) and accepts
/// writes
pub fn ensure_destination_writable(dest_root: &Path) -> Result<()> {
    fs::create_dir_all(dest_root).map_err(|err| {
        ImportError::DestinationUnreachable(format!(
            "cannot create {}: {}",
            dest_root.display(),
            err
        ))
    })?;

    let probe = dest_root.join(".write-test");
    fs::write(&probe, b"").map_err(|err| {
        ImportError::DestinationUnreachable(format!(
            "cannot write to {}: {}",
            dest_root.display(),
            err
        ))
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/dest/2024/07/clip.mov")),
            PathBuf::from("/dest/2024/07/clip.mov.partial")
        );
    }

    #[test]
    fn test_ensure_destination_writable_creates_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("library").join("media");
        ensure_destination_writable(&root).unwrap();
        assert!(root.is_dir());
        assert!(!root.join(".write-test").exists());
    }
}
