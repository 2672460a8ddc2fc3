//! Catalog download orchestration.
//!
//! `Downloader` owns the handle pool, the cache store, and the retry
//! policy for one run. Blocking entry points do the work on the calling
//! thread (or the scheduler's worker threads); async wrappers move them
//! onto tokio's blocking pool.

mod failure;
mod single;

pub use failure::FetchFailure;

use crate::catalog::{parse_offer_index, OfferIndex, Resource};
use crate::cache::CacheStore;
use crate::config::ApdConfig;
use crate::control::CancelToken;
use crate::metrics::{DownloadResult, Outcome};
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::scheduler;
use crate::transport::{self, HandlePool, RequestOptions};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Downloader {
    config: ApdConfig,
    pool: HandlePool,
    cache: CacheStore,
    policy: RetryPolicy,
}

impl Downloader {
    /// Validates `config` and sets up the pool and cache store.
    pub fn new(config: ApdConfig) -> Result<Self> {
        config.validate()?;
        let pool = HandlePool::new(config.pool_size);
        let cache = CacheStore::new(&config.output_dir);
        let policy = RetryPolicy::from_config(&config.retry());
        Ok(Self {
            config,
            pool,
            cache,
            policy,
        })
    }

    pub fn config(&self) -> &ApdConfig {
        &self.config
    }

    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            connect_timeout: Duration::from_secs(self.config.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.config.read_timeout_secs),
            total_timeout: Duration::from_secs(self.config.total_timeout_secs),
            chunk_size: self.config.chunk_size,
            user_agent: self.config.user_agent.clone(),
        }
    }

    /// Fetch and parse the offer index at `<base_url>/index.json`.
    pub fn fetch_index_blocking(&self, cancel: &CancelToken) -> Result<OfferIndex> {
        let url = format!(
            "{}/index.json",
            self.config.base_url.trim_end_matches('/')
        );
        let opts = self.request_options();
        let body = run_with_retry(&self.policy, cancel, || {
            let mut handle = self.pool.acquire();
            let mut buf: Vec<u8> = Vec::new();
            let mut sink = |chunk: &[u8]| -> std::io::Result<()> {
                buf.extend_from_slice(chunk);
                Ok(())
            };
            let response =
                transport::fetch(handle.easy(), &url, None, &opts, cancel, &mut sink)?;
            match response.status {
                200 => Ok(buf),
                code => Err(FetchError::Http(code)),
            }
        })
        .map_err(FetchFailure::from)
        .with_context(|| format!("fetch offer index {}", url))?;
        parse_offer_index(&body)
    }

    /// Fetch a single resource to completion.
    pub fn fetch_one_blocking(
        &self,
        resource: &Resource,
        force: bool,
        cancel: &CancelToken,
    ) -> std::result::Result<DownloadResult, FetchFailure> {
        single::fetch_resource(self, resource, force, cancel)
    }

    /// Fetch every resource with bounded concurrency.
    ///
    /// One record per input, in input order. A failed resource becomes a
    /// `Failure` record; it never aborts or delays its siblings.
    pub fn fetch_all_blocking(
        &self,
        resources: &[Resource],
        force: bool,
        cancel: &CancelToken,
    ) -> Vec<DownloadResult> {
        let jobs: Vec<Resource> = resources.to_vec();
        let out = scheduler::run_pool(jobs, self.config.max_concurrent, |resource| {
            let started = Instant::now();
            match self.fetch_one_blocking(&resource, force, cancel) {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(resource = %resource.id, error = %e, "fetch failed");
                    DownloadResult {
                        resource_id: resource.id,
                        outcome: Outcome::Failure,
                        bytes: 0,
                        duration_secs: started.elapsed().as_secs_f64(),
                        error: Some(e.to_string()),
                    }
                }
            }
        });
        out.into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| DownloadResult {
                    resource_id: resources[i].id.clone(),
                    outcome: Outcome::Failure,
                    bytes: 0,
                    duration_secs: 0.0,
                    error: Some("download worker panicked".to_string()),
                })
            })
            .collect()
    }

    pub async fn fetch_index(self: &Arc<Self>, cancel: &CancelToken) -> Result<OfferIndex> {
        let this = Arc::clone(self);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || this.fetch_index_blocking(&cancel))
            .await
            .context("offer index task panicked")?
    }

    pub async fn fetch_one(
        self: &Arc<Self>,
        resource: Resource,
        force: bool,
        cancel: &CancelToken,
    ) -> Result<DownloadResult> {
        let this = Arc::clone(self);
        let cancel = cancel.clone();
        let out = tokio::task::spawn_blocking(move || {
            this.fetch_one_blocking(&resource, force, &cancel)
        })
        .await
        .context("download task panicked")?;
        Ok(out?)
    }

    pub async fn fetch_all(
        self: &Arc<Self>,
        resources: Vec<Resource>,
        force: bool,
        cancel: &CancelToken,
    ) -> Result<Vec<DownloadResult>> {
        let this = Arc::clone(self);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || this.fetch_all_blocking(&resources, force, &cancel))
            .await
            .context("download task panicked")
    }
}
