//! Per-download records and their aggregate view.
//!
//! The collector is a plain append-only list; the aggregate is computed
//! from the records on demand, so the two can never disagree.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Terminal outcome of one resource's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Full body downloaded and committed.
    Success,
    /// 304 against the stored validator; nothing written.
    CacheHit,
    Failure,
}

/// Record of one completed attempt sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub resource_id: String,
    pub outcome: Outcome,
    /// Body bytes transferred (0 for cache hits and most failures).
    pub bytes: u64,
    /// Wall-clock seconds from first attempt to terminal outcome.
    pub duration_secs: f64,
    /// Human-readable cause, present only for failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate over a set of download records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total: usize,
    pub successes: usize,
    pub cache_hits: usize,
    pub failures: usize,
    pub bytes_transferred: u64,
    pub total_duration_secs: f64,
    pub avg_duration_secs: f64,
}

/// Folds records into an aggregate. Pure; same records, same answer.
pub fn aggregate(records: &[DownloadResult]) -> Aggregate {
    let mut agg = Aggregate {
        total: records.len(),
        successes: 0,
        cache_hits: 0,
        failures: 0,
        bytes_transferred: 0,
        total_duration_secs: 0.0,
        avg_duration_secs: 0.0,
    };
    for r in records {
        match r.outcome {
            Outcome::Success => agg.successes += 1,
            Outcome::CacheHit => agg.cache_hits += 1,
            Outcome::Failure => agg.failures += 1,
        }
        agg.bytes_transferred += r.bytes;
        agg.total_duration_secs += r.duration_secs;
    }
    if agg.total > 0 {
        agg.avg_duration_secs = agg.total_duration_secs / agg.total as f64;
    }
    agg
}

/// Accumulates download records for one run.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    records: Vec<DownloadResult>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: DownloadResult) {
        self.records.push(result);
    }

    pub fn records(&self) -> &[DownloadResult] {
        &self.records
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate(&self.records)
    }

    /// Write the aggregate and per-download records as JSON to `path`,
    /// creating parent directories as needed.
    pub fn export(&self, path: &Path) -> io::Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            aggregate: Aggregate,
            downloads: &'a [DownloadResult],
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(&Export {
            aggregate: self.aggregate(),
            downloads: &self.records,
        })
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, body)
    }
}
