//! On-disk cache for fetched page text
//!
//! Records are content-addressed by a SHA-256 hash of the source URL and
//! expire by file modification time. A stale record is a cache miss, not an
//! error; the file stays on disk until overwritten or purged.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::types::{CacheStats, ContextError};

/// TTL-bound file cache keyed by URL hash
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
    write_seq: AtomicU64,
}

impl FileCache {
    /// Create a cache rooted at `dir`, creating the directory if needed
    ///
    /// # Arguments
    /// * `dir` - Cache directory
    /// * `ttl_secs` - Record time-to-live in seconds
    pub fn new(dir: impl Into<PathBuf>, ttl_secs: u64) -> Result<Self, ContextError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| ContextError::CacheIo {
            message: format!("failed to create cache dir {}: {}", dir.display(), e),
        })?;
        Ok(Self {
            dir,
            ttl: Duration::from_secs(ttl_secs),
            write_seq: AtomicU64::new(0),
        })
    }

    /// Get cached text for a URL if the record exists and is within the TTL
    pub fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let age = file_age(&path)?;
        if age > self.ttl {
            debug!(
                "Cache expired for {} (age: {:.1}h)",
                url,
                age.as_secs_f64() / 3600.0
            );
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Cache read failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Write (or overwrite) the record for a URL
    ///
    /// Writes to a temp file and renames it into place so a failed write
    /// never leaves a partial record.
    pub fn put(&self, url: &str, text: &str) -> Result<(), ContextError> {
        let path = self.path_for(url);
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!("{}.{}.{}.tmp", hash_url(url), std::process::id(), seq));
        fs::write(&tmp, text).map_err(|e| ContextError::CacheIo {
            message: format!("failed to write {}: {}", tmp.display(), e),
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ContextError::CacheIo {
                message: format!("failed to commit {}: {}", path.display(), e),
            }
        })
    }

    /// Delete all cache records, returning the number removed
    pub fn purge_all(&self) -> usize {
        let mut count = 0;
        for path in self.record_paths() {
            match fs::remove_file(&path) {
                Ok(()) => count += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        count
    }

    /// Delete the records for the given URLs, returning the number removed
    pub fn purge_urls(&self, urls: &[String]) -> usize {
        let mut count = 0;
        for url in urls {
            let path = self.path_for(url);
            if path.exists() {
                match fs::remove_file(&path) {
                    Ok(()) => count += 1,
                    Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }
        count
    }

    /// Scan all records and report cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut file_count = 0;
        let mut total_size_bytes = 0;
        let mut oldest: Option<Duration> = None;
        let mut newest: Option<Duration> = None;

        for path in self.record_paths() {
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            file_count += 1;
            total_size_bytes += meta.len();
            if let Some(age) = file_age(&path) {
                oldest = Some(oldest.map_or(age, |o| o.max(age)));
                newest = Some(newest.map_or(age, |n| n.min(age)));
            }
        }

        CacheStats {
            file_count,
            total_size_bytes,
            oldest_file_age_hours: oldest.map(|a| a.as_secs_f64() / 3600.0),
            newest_file_age_hours: newest.map(|a| a.as_secs_f64() / 3600.0),
        }
    }

    /// Record time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", hash_url(url)))
    }

    fn record_paths(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            warn!("Cache dir unreadable: {}", self.dir.display());
            return Vec::new();
        };
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect()
    }
}

/// Fixed-width cache key: SHA-256 of the URL, hex encoded
fn hash_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

fn file_age(path: &std::path::Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}
