//! Validator and digest records persisted next to downloaded content.
//!
//! Each resource gets one JSON sidecar (`<id>.sha256`) holding the ETag the
//! server sent, the SHA-256 of the committed body, and when it was verified.
//! A missing or unreadable sidecar just means "no prior state"; the next
//! fetch is unconditional and rewrites it.

use crate::catalog::sanitize_service_code;
use crate::storage;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sidecar file suffix.
pub const RECORD_SUFFIX: &str = ".sha256";

/// Persisted per-resource validation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub resource_id: String,
    /// ETag from the last 200 response, quotes stripped. Absent when the
    /// server sent none; such resources are always refetched in full.
    pub etag: Option<String>,
    /// Lowercase hex SHA-256 of the committed body.
    pub sha256: String,
    /// Seconds since the Unix epoch when the digest was recorded.
    pub verified_at_unix: u64,
}

impl CacheRecord {
    pub fn new(resource_id: &str, etag: Option<String>, sha256: String) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            etag,
            sha256,
            verified_at_unix: unix_now(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Directory of sidecar records, one per resource.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn record_path(&self, resource_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", sanitize_service_code(resource_id), RECORD_SUFFIX))
    }

    /// Load the record for a resource. Corruption and read failures are
    /// logged and treated as absence, never propagated.
    pub fn load(&self, resource_id: &str) -> Option<CacheRecord> {
        let path = self.record_path(resource_id);
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "unreadable cache record, refetching in full"
                );
                return None;
            }
        };
        match serde_json::from_slice::<CacheRecord>(&data) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt cache record, refetching in full"
                );
                None
            }
        }
    }

    /// Persist a record, replacing any prior one. Written via a temp file
    /// and rename so a crash never leaves a half-written sidecar.
    pub fn store(&self, record: &CacheRecord) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.record_path(&record.resource_id);
        let temp = storage::temp_path(&path);
        let body = serde_json::to_vec_pretty(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(&temp, body)?;
        std::fs::rename(&temp, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        assert!(store.load("AmazonEC2").is_none());
    }

    #[test]
    fn store_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let rec = CacheRecord::new("AmazonEC2", Some("abc-123".into()), "deadbeef".into());
        store.store(&rec).unwrap();
        assert_eq!(store.load("AmazonEC2"), Some(rec));
    }

    #[test]
    fn corrupt_record_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        std::fs::write(store.record_path("AmazonS3"), b"{not json").unwrap();
        assert!(store.load("AmazonS3").is_none());
    }

    #[test]
    fn store_replaces_prior_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store
            .store(&CacheRecord::new("AmazonRDS", None, "aaaa".into()))
            .unwrap();
        store
            .store(&CacheRecord::new(
                "AmazonRDS",
                Some("v2".into()),
                "bbbb".into(),
            ))
            .unwrap();
        let loaded = store.load("AmazonRDS").unwrap();
        assert_eq!(loaded.etag.as_deref(), Some("v2"));
        assert_eq!(loaded.sha256, "bbbb");
    }

    #[test]
    fn record_path_stays_inside_store_dir() {
        let store = CacheStore::new(Path::new("/data"));
        let p = store.record_path("bad/../code");
        assert_eq!(p.parent(), Some(Path::new("/data")));
        assert_eq!(p.file_name().unwrap().to_string_lossy(), "bad_.._code.sha256");
    }
}
