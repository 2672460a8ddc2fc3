//! One resource's conditional fetch: validator, retries, staging, commit.

use super::failure::FetchFailure;
use super::Downloader;
use crate::cache::CacheRecord;
use crate::catalog::Resource;
use crate::control::CancelToken;
use crate::integrity::{self, compare_digest, DigestComparison, StreamDigest};
use crate::metrics::{DownloadResult, Outcome};
use crate::retry::{run_with_retry, FetchError};
use crate::storage::StreamWriter;
use crate::transport::{self, FetchResponse};
use std::io;
use std::time::Instant;

/// What a successful attempt sequence produced.
enum AttemptOutcome {
    /// 200: full body staged in the writer's temp file, not yet committed.
    Fresh {
        writer: StreamWriter,
        digest: StreamDigest,
        response: FetchResponse,
    },
    /// 304 against the offered validator; nothing was written.
    NotModified,
}

/// Fetch one catalog to its output path, consulting the cache record.
///
/// The stored validator turns the request conditional unless `force` is
/// set. A 304 leaves disk state untouched. A 200 stages the body, checks
/// the digest while the temp file still exists, commits atomically, and
/// only then rewrites the sidecar record.
pub(super) fn fetch_resource(
    dl: &Downloader,
    resource: &Resource,
    force: bool,
    cancel: &CancelToken,
) -> Result<DownloadResult, FetchFailure> {
    let started = Instant::now();
    if cancel.is_cancelled() {
        return Err(FetchFailure::Cancelled);
    }

    let prior = dl.cache.load(&resource.id);
    let validator: Option<String> = if force {
        None
    } else {
        prior.as_ref().and_then(|r| r.etag.clone())
    };

    if let Some(parent) = resource.output_path.parent() {
        std::fs::create_dir_all(parent).map_err(FetchFailure::Storage)?;
    }

    let opts = dl.request_options();
    let outcome = run_with_retry(&dl.policy, cancel, || {
        let mut handle = dl.pool.acquire();
        let mut writer =
            StreamWriter::create(&resource.output_path).map_err(FetchError::Storage)?;
        let mut digest = StreamDigest::new();
        let mut sink = |chunk: &[u8]| -> io::Result<()> {
            writer.write_chunk(chunk)?;
            digest.update(chunk);
            Ok(())
        };
        let response = transport::fetch(
            handle.easy(),
            &resource.url,
            validator.as_deref(),
            &opts,
            cancel,
            &mut sink,
        )?;
        match response.status {
            200 => Ok(AttemptOutcome::Fresh {
                writer,
                digest,
                response,
            }),
            304 => Ok(AttemptOutcome::NotModified),
            code => Err(FetchError::Http(code)),
        }
    })
    .map_err(FetchFailure::from)?;

    match outcome {
        AttemptOutcome::NotModified => {
            tracing::info!(resource = %resource.id, "validator matched, cache hit");
            Ok(DownloadResult {
                resource_id: resource.id.clone(),
                outcome: Outcome::CacheHit,
                bytes: 0,
                duration_secs: started.elapsed().as_secs_f64(),
                error: None,
            })
        }
        AttemptOutcome::Fresh {
            writer,
            digest,
            response,
        } => {
            let streamed = digest.finalize_hex();
            if dl.config.verify_integrity {
                let staged = integrity::sha256_path(writer.temp_path())
                    .map_err(|e| FetchFailure::Integrity(format!("{:#}", e)))?;
                if staged != streamed {
                    return Err(FetchFailure::Integrity(format!(
                        "staged digest {} does not match streamed digest {}",
                        staged, streamed
                    )));
                }
            }
            let bytes = writer.bytes_written();
            writer.commit().map_err(FetchFailure::Storage)?;

            if let (Some(sent), Some(prior_rec)) = (validator.as_deref(), prior.as_ref()) {
                if response.etag.as_deref() == Some(sent) {
                    if let DigestComparison::Changed { prior: old } =
                        compare_digest(Some(&prior_rec.sha256), &streamed)
                    {
                        tracing::warn!(
                            resource = %resource.id,
                            etag = sent,
                            prior_sha256 = %old,
                            current_sha256 = %streamed,
                            "content changed under an unchanged validator; local copy refreshed"
                        );
                    }
                }
            }

            let record = CacheRecord::new(&resource.id, response.etag.clone(), streamed);
            dl.cache.store(&record).map_err(FetchFailure::Storage)?;
            tracing::info!(resource = %resource.id, bytes, "catalog committed");
            Ok(DownloadResult {
                resource_id: resource.id.clone(),
                outcome: Outcome::Success,
                bytes,
                duration_secs: started.elapsed().as_secs_f64(),
                error: None,
            })
        }
    }
}
