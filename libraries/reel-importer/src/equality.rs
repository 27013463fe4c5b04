//! Content-equality strategies for duplicate and pre-existing detection
//!
//! The default heuristic treats two files as identical when their byte sizes
//! match and their modification times are within a fixed proximity window;
//! when sizes match but the timestamps disagree, a full SHA-256 comparison
//! decides. This catches same-content files whose timestamps were touched by
//! an earlier copy without hashing every file in a scan.

use crate::Result;
use chrono::{DateTime, Utc};
use reel_core::types::MediaRecord;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default buffer size for digest computation (64KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// Timestamp proximity treated as proof of equality when sizes match
pub const MTIME_PROXIMITY_WINDOW_SECS: i64 = 60;

/// The size/mtime signature of a file, as seen by an equality strategy
#[derive(Debug, Clone)]
pub struct FileSig {
    pub path: PathBuf,
    pub byte_size: u64,
    pub modified_at: DateTime<Utc>,
}

impl FileSig {
    /// Read a signature from the filesystem
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified_at = meta.modified().map(DateTime::<Utc>::from)?;
        Ok(Self {
            path: path.to_path_buf(),
            byte_size: meta.len(),
            modified_at,
        })
    }

    /// Use the signature captured on a record at scan time
    pub fn from_record(record: &MediaRecord) -> Self {
        Self {
            path: record.source_path.clone(),
            byte_size: record.byte_size,
            modified_at: record.modified_at,
        }
    }
}

/// Pluggable content-equality capability
///
/// Strategies decide whether two files hold identical content; the
/// duplicate/collision algorithms stay independent of hashing cost.
pub trait ContentEquality: Send + Sync {
    /// Whether the two files hold identical content
    fn same_content(&self, a: &FileSig, b: &FileSig) -> Result<bool>;
}

/// Size-and-timestamp heuristic with digest fallback (default strategy)
pub struct HeuristicEquality {
    window_secs: i64,
    digests: Mutex<HashMap<PathBuf, String>>,
}

impl HeuristicEquality {
    /// Create the heuristic with the standard 60-second proximity window
    pub fn new() -> Self {
        Self::with_window(MTIME_PROXIMITY_WINDOW_SECS)
    }

    /// Create the heuristic with a custom proximity window
    pub fn with_window(window_secs: i64) -> Self {
        Self {
            window_secs,
            digests: Mutex::new(HashMap::new()),
        }
    }

    fn digest(&self, path: &Path) -> Result<String> {
        if let Ok(memo) = self.digests.lock() {
            if let Some(digest) = memo.get(path) {
                return Ok(digest.clone());
            }
        }
        let digest = compute_file_digest(path)?;
        if let Ok(mut memo) = self.digests.lock() {
            memo.insert(path.to_path_buf(), digest.clone());
        }
        Ok(digest)
    }
}

impl Default for HeuristicEquality {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentEquality for HeuristicEquality {
    fn same_content(&self, a: &FileSig, b: &FileSig) -> Result<bool> {
        if a.byte_size != b.byte_size {
            return Ok(false);
        }
        let drift = (a.modified_at - b.modified_at).num_seconds().abs();
        if drift <= self.window_secs {
            return Ok(true);
        }
        // Sizes match but timestamps disagree; let the digests decide
        Ok(self.digest(&a.path)? == self.digest(&b.path)?)
    }
}

/// Digest-always strategy, for callers that cannot tolerate the heuristic's
/// false positives
pub struct DigestEquality;

impl ContentEquality for DigestEquality {
    fn same_content(&self, a: &FileSig, b: &FileSig) -> Result<bool> {
        if a.byte_size != b.byte_size {
            return Ok(false);
        }
        Ok(compute_file_digest(&a.path)? == compute_file_digest(&b.path)?)
    }
}

/// Compute the SHA-256 digest of a file
pub fn compute_file_digest(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize();
    Ok(hex::encode(hash))
}
