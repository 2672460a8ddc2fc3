//! `apd fetch` – download service catalogs with conditional requests.

use anyhow::Result;
use apd_core::catalog;
use apd_core::config::ApdConfig;
use apd_core::control::CancelToken;
use apd_core::downloader::Downloader;
use apd_core::metrics::{MetricsCollector, Outcome};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run_fetch(
    mut cfg: ApdConfig,
    services: Vec<String>,
    output_dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    if let Some(dir) = output_dir {
        cfg.output_dir = dir;
    }
    let base_url = cfg.base_url.clone();
    let output_dir = cfg.output_dir.clone();

    let downloader = Arc::new(Downloader::new(cfg)?);
    let cancel = CancelToken::new();

    let index = downloader.fetch_index(&cancel).await?;
    let subset = if services.is_empty() {
        None
    } else {
        Some(services)
    };
    let resources = catalog::resources_for(&index, &base_url, &output_dir, subset.as_deref())?;

    println!(
        "Fetching {} catalog(s) into {}",
        resources.len(),
        output_dir.display()
    );

    let results = downloader.fetch_all(resources, force, &cancel).await?;

    let mut metrics = MetricsCollector::new();
    println!("{:<28} {:<10} {:>12} {:>8}", "SERVICE", "OUTCOME", "BYTES", "SECS");
    for r in &results {
        let outcome = match r.outcome {
            Outcome::Success => "success",
            Outcome::CacheHit => "cache-hit",
            Outcome::Failure => "failed",
        };
        println!(
            "{:<28} {:<10} {:>12} {:>8.2}",
            r.resource_id, outcome, r.bytes, r.duration_secs
        );
        if let Some(err) = &r.error {
            println!("    {}", err);
        }
        metrics.record(r.clone());
    }

    let agg = metrics.aggregate();
    println!(
        "{} fetched, {} cache hits, {} failed; {} bytes in {:.2}s",
        agg.successes, agg.cache_hits, agg.failures, agg.bytes_transferred, agg.total_duration_secs
    );

    let metrics_path = output_dir.join("metrics").join("latest.json");
    metrics.export(&metrics_path)?;
    tracing::debug!("metrics written to {}", metrics_path.display());

    if agg.failures > 0 {
        anyhow::bail!("{} of {} catalogs failed", agg.failures, agg.total);
    }
    Ok(())
}
