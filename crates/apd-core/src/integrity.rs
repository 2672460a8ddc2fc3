//! Content digests and drift detection.
//!
//! The downloader hashes the body incrementally as chunks stream to disk,
//! so the digest never requires buffering or re-reading the content. The
//! drift comparison against a prior record runs only after a full receipt.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Incremental SHA-256 over a streamed body.
#[derive(Default)]
pub struct StreamDigest {
    hasher: Sha256,
}

impl StreamDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Finish and return the digest as lowercase hex.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Compute SHA-256 of a file on disk and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of comparing a freshly computed digest against a prior record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestComparison {
    /// No prior digest; the new content becomes the baseline.
    FirstFetch,
    /// Prior and current digests match.
    Unchanged,
    /// Content changed. Under an unchanged validator this is undeclared
    /// remote drift; it is reported, never treated as an error.
    Changed { prior: String },
}

/// Compare a new digest with an optional stored one.
pub fn compare_digest(prior: Option<&str>, current: &str) -> DigestComparison {
    match prior {
        None => DigestComparison::FirstFetch,
        Some(p) if p == current => DigestComparison::Unchanged,
        Some(p) => DigestComparison::Changed {
            prior: p.to_string(),
        },
    }
}
