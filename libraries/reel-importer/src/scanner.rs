//! Source tree scanning, classification, and duplicate detection
//!
//! Walks the source tree in lexicographic order, classifies files by
//! extension, attaches sidecar files to their primary record, detects
//! in-source duplicates via the content-equality strategy, and probes the
//! destination for pre-existing content and filename collisions.

use crate::equality::{ContentEquality, FileSig, HeuristicEquality};
use crate::{resolver, ImportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reel_core::types::{
    CatalogSnapshot, DestinationSettings, MediaRecord, MediaType, RecordStatus,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Default image extensions
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "heic", "heif", "png", "gif", "tiff", "tif", "dng", "cr2",
    "cr3", "nef", "arw", "raf", "orf", "rw2",
];

/// Default video extensions
const VIDEO_EXTENSIONS: &[&str] = &[
    "mov", "mp4", "m4v", "avi", "mts", "m2ts", "mkv", "mpg", "3gp", "lrv",
];

/// Default audio extensions
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "aac", "flac", "ogg"];

/// Sidecar extensions attached to a primary record with the same stem
const SIDECAR_EXTENSIONS: &[&str] = &["thm", "xmp", "aae"];

/// Camera thumbnail/cache directories never descended into
const SKIP_DIRECTORIES: &[&str] = &[".thumbnails", "THMBNL", "MISC", "__MACOSX", ".Trashes"];

/// Upper bound on collision suffix probing
pub(crate) const MAX_COLLISION_SUFFIXES: u32 = 1000;

/// Configuration for source scans
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Extensions classified as images (lowercase)
    pub image_extensions: BTreeSet<String>,

    /// Extensions classified as videos (lowercase)
    pub video_extensions: BTreeSet<String>,

    /// Extensions classified as audio (lowercase)
    pub audio_extensions: BTreeSet<String>,

    /// Extensions attached as sidecars instead of cataloged (lowercase)
    pub sidecar_extensions: BTreeSet<String>,

    /// Directory names pruned from the walk
    pub skip_directories: BTreeSet<String>,

    /// Whether to follow symbolic links
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let to_set = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
        Self {
            image_extensions: to_set(IMAGE_EXTENSIONS),
            video_extensions: to_set(VIDEO_EXTENSIONS),
            audio_extensions: to_set(AUDIO_EXTENSIONS),
            sidecar_extensions: to_set(SIDECAR_EXTENSIONS),
            skip_directories: to_set(SKIP_DIRECTORIES),
            follow_links: false,
        }
    }
}

impl ScanConfig {
    /// Classify a path by its extension; `None` means unrecognized
    pub fn classify(&self, path: &Path) -> Option<MediaType> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if self.image_extensions.contains(&ext) {
            Some(MediaType::Image)
        } else if self.video_extensions.contains(&ext) {
            Some(MediaType::Video)
        } else if self.audio_extensions.contains(&ext) {
            Some(MediaType::Audio)
        } else {
            None
        }
    }

    /// Whether the path carries a recognized sidecar extension
    pub fn is_sidecar(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.sidecar_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    fn should_skip_dir(&self, name: &str) -> bool {
        self.skip_directories.contains(name)
    }
}

/// Scanner for media files in a source tree
#[derive(Clone)]
pub struct Scanner {
    config: ScanConfig,
    equality: Arc<dyn ContentEquality>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Create a scanner with the default configuration and the
    /// size/timestamp equality heuristic
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
            equality: Arc::new(HeuristicEquality::new()),
        }
    }

    /// Replace the scan configuration
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the content-equality strategy
    pub fn with_equality(mut self, equality: Arc<dyn ContentEquality>) -> Self {
        self.equality = equality;
        self
    }

    /// Scan a source tree into a catalog snapshot
    ///
    /// When `dest_root` is supplied, each record's destination path is
    /// resolved and probed for pre-existing content and filename collisions;
    /// without it, records stay `Waiting` with no destination.
    ///
    /// # Errors
    ///
    /// Fails when the source root is missing or not a directory, on
    /// cancellation, or when collision probing exhausts its suffix budget.
    /// Unreadable subtrees are logged and omitted rather than failing the
    /// scan.
    pub fn scan(
        &self,
        source_root: &Path,
        dest_root: Option<&Path>,
        settings: &DestinationSettings,
        cancel: &CancellationToken,
    ) -> Result<CatalogSnapshot> {
        if !source_root.exists() {
            return Err(ImportError::SourceNotFound(
                source_root.display().to_string(),
            ));
        }
        if !source_root.is_dir() {
            return Err(ImportError::InvalidPath(format!(
                "{} is not a directory",
                source_root.display()
            )));
        }

        let mut records = self.enumerate(source_root, settings, cancel)?;
        self.detect_duplicates(&mut records, cancel)?;

        if let Some(root) = dest_root {
            let mut claimed = HashSet::new();
            for record in records.iter_mut() {
                if cancel.is_cancelled() {
                    return Err(ImportError::Cancelled);
                }
                if record.status == RecordStatus::DuplicateInSource {
                    continue;
                }
                let (dest, status) = allocate_destination(
                    record,
                    root,
                    settings,
                    self.equality.as_ref(),
                    &claimed,
                )?;
                claimed.insert(dest.clone());
                record.dest_path = Some(dest);
                record.status = status;
            }
        }

        tracing::info!(
            "Scanned {}: {} records ({} duplicates)",
            source_root.display(),
            records.len(),
            records
                .iter()
                .filter(|r| r.status == RecordStatus::DuplicateInSource)
                .count()
        );

        Ok(CatalogSnapshot::new(records))
    }

    /// Walk the tree and build records with sidecars attached, sorted by
    /// source path
    fn enumerate(
        &self,
        source_root: &Path,
        settings: &DestinationSettings,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaRecord>> {
        let mut media_files: Vec<PathBuf> = Vec::new();
        let mut sidecars: HashMap<(PathBuf, String), Vec<PathBuf>> = HashMap::new();

        let walker = WalkDir::new(source_root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && self.config.should_skip_dir(&entry.file_name().to_string_lossy()))
            });

        for entry in walker {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable subtree: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();

            if self.config.is_sidecar(path) {
                if let Some(key) = sidecar_key(path) {
                    sidecars.entry(key).or_default().push(path.to_path_buf());
                }
                continue;
            }

            match self.config.classify(path) {
                Some(media_type) if settings.is_enabled(media_type) => {
                    media_files.push(path.to_path_buf());
                }
                Some(_) | None => {
                    tracing::debug!("Excluding {}", path.display());
                }
            }
        }

        let mut records = Vec::with_capacity(media_files.len());
        for path in media_files {
            let meta = match std::fs::metadata(&path) {
                Ok(meta) => meta,
                Err(err) => {
                    tracing::warn!("Skipping unreadable file {}: {}", path.display(), err);
                    continue;
                }
            };
            let modified_at = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let media_type = self
                .config
                .classify(&path)
                .unwrap_or(MediaType::Unknown);
            let captured_at = match media_type {
                MediaType::Image => exif_capture_date(&path).unwrap_or(modified_at),
                _ => modified_at,
            };

            let mut record =
                MediaRecord::new(&path, media_type, captured_at, modified_at, meta.len());
            if let Some(key) = sidecar_key(&path) {
                if let Some(mut attached) = sidecars.remove(&key) {
                    attached.sort();
                    record.sidecar_paths = attached;
                }
            }
            records.push(record);
        }

        records.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(records)
    }

    /// Mark later occurrences of identical content as in-source duplicates
    ///
    /// Records must already be in source-path order; `duplicate_of` points at
    /// the first-seen match.
    fn detect_duplicates(
        &self,
        records: &mut [MediaRecord],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();

        for i in 0..records.len() {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            let sig = FileSig::from_record(&records[i]);
            let mut first_match = None;
            if let Some(prior) = by_size.get(&records[i].byte_size) {
                for &j in prior {
                    if self
                        .equality
                        .same_content(&sig, &FileSig::from_record(&records[j]))?
                    {
                        first_match = Some(records[j].source_path.clone());
                        break;
                    }
                }
            }
            if let Some(original) = first_match {
                records[i].status = RecordStatus::DuplicateInSource;
                records[i].duplicate_of = Some(original);
            }
            by_size.entry(records[i].byte_size).or_default().push(i);
        }

        Ok(())
    }
}

/// Grouping key for sidecar attachment: same directory, same stem
fn sidecar_key(path: &Path) -> Option<(PathBuf, String)> {
    let parent = path.parent()?.to_path_buf();
    let stem = path.file_stem()?.to_str()?.to_lowercase();
    Some((parent, stem))
}

/// Outcome of probing one destination candidate
enum Probe {
    /// Nothing at the candidate path; slot is free
    Free,
    /// Identical content already at the candidate path
    Identical,
    /// Different content at the candidate path (or claimed this pass)
    Taken,
}

/// Resolve a record's destination, probing for pre-existing content and
/// allocating a collision suffix when needed
///
/// `claimed` holds destination paths assigned earlier in the same pass;
/// in-source duplicates were filtered beforehand, so a claimed path always
/// means distinct content and the probe moves to the next suffix. Returns
/// the resolved path and the resulting status (`Waiting` for a free slot,
/// `PreExisting` when identical content is already there).
pub(crate) fn allocate_destination(
    record: &MediaRecord,
    dest_root: &Path,
    settings: &DestinationSettings,
    equality: &dyn ContentEquality,
    claimed: &HashSet<PathBuf>,
) -> Result<(PathBuf, RecordStatus)> {
    let source_sig = FileSig::from_record(record);

    let base = resolver::resolve_destination(record, dest_root, settings, None);
    match probe_candidate(&base, &source_sig, equality, claimed)? {
        Probe::Free => return Ok((base, RecordStatus::Waiting)),
        Probe::Identical => return Ok((base, RecordStatus::PreExisting)),
        Probe::Taken => {}
    }

    for n in 1..=MAX_COLLISION_SUFFIXES {
        let candidate = resolver::resolve_destination(record, dest_root, settings, Some(n));
        match probe_candidate(&candidate, &source_sig, equality, claimed)? {
            Probe::Free => return Ok((candidate, RecordStatus::Waiting)),
            Probe::Identical => return Ok((candidate, RecordStatus::PreExisting)),
            Probe::Taken => continue,
        }
    }

    Err(ImportError::CollisionOverflow(
        record.source_path.display().to_string(),
        MAX_COLLISION_SUFFIXES,
    ))
}

fn probe_candidate(
    candidate: &Path,
    source: &FileSig,
    equality: &dyn ContentEquality,
    claimed: &HashSet<PathBuf>,
) -> Result<Probe> {
    if claimed.contains(candidate) {
        return Ok(Probe::Taken);
    }
    if !candidate.exists() {
        return Ok(Probe::Free);
    }
    let dest_sig = FileSig::of(candidate)?;
    if equality.same_content(source, &dest_sig)? {
        Ok(Probe::Identical)
    } else {
        Ok(Probe::Taken)
    }
}

/// Read the EXIF `DateTimeOriginal` tag, treated as UTC
fn exif_capture_date(path: &Path) -> Option<DateTime<Utc>> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let ascii = match field.value {
        exif::Value::Ascii(ref values) => values.first()?,
        _ => return None,
    };
    let dt = exif::DateTime::from_ascii(ascii).ok()?;
    let naive = NaiveDate::from_ymd_opt(
        i32::from(dt.year),
        u32::from(dt.month),
        u32::from(dt.day),
    )?
    .and_hms_opt(
        u32::from(dt.hour),
        u32::from(dt.minute),
        u32::from(dt.second),
    )?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}
