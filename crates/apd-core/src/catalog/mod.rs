//! Offer index parsing and resource resolution.
//!
//! The remote catalog publishes an index document at `<base_url>/index.json`
//! whose `offers` map keys are service codes. Each code resolves to one
//! Resource: the catalog URL plus a deterministic local output path.

mod sanitize;

pub use sanitize::sanitize_service_code;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One entry of the offer index. Only the fields apd consumes are modeled;
/// unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferEntry {
    #[serde(rename = "offerCode")]
    pub offer_code: Option<String>,
    /// Server-relative URL of the current catalog version, when published.
    #[serde(rename = "currentVersionUrl")]
    pub current_version_url: Option<String>,
}

/// The offer index document. `BTreeMap` keeps service order deterministic.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferIndex {
    #[serde(default)]
    pub offers: BTreeMap<String, OfferEntry>,
}

impl OfferIndex {
    /// All service codes in the index, in stable (sorted) order.
    pub fn service_codes(&self) -> Vec<String> {
        self.offers.keys().cloned().collect()
    }
}

/// One unit of work: a service catalog to fetch. Immutable per run.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Service code, doubling as the cache key (e.g. "AmazonEC2").
    pub id: String,
    /// Absolute URL of the catalog document.
    pub url: String,
    /// Final on-disk location of the committed catalog.
    pub output_path: PathBuf,
}

/// Parse the raw offer index document.
pub fn parse_offer_index(body: &[u8]) -> Result<OfferIndex> {
    let index: OfferIndex =
        serde_json::from_slice(body).context("malformed offer index document")?;
    if index.offers.is_empty() {
        anyhow::bail!("offer index lists no services");
    }
    Ok(index)
}

/// URL of the current catalog for `code`: the index's `currentVersionUrl`
/// when present, otherwise `<base_url>/<code>/current/index.json`.
pub fn service_url(base_url: &str, code: &str, entry: Option<&OfferEntry>) -> Result<String> {
    if let Some(relative) = entry.and_then(|e| e.current_version_url.as_deref()) {
        let base = url::Url::parse(base_url)
            .with_context(|| format!("invalid base URL: {}", base_url))?;
        let joined = base
            .join(relative)
            .with_context(|| format!("invalid currentVersionUrl for {}: {}", code, relative))?;
        return Ok(joined.to_string());
    }
    Ok(format!(
        "{}/{}/current/index.json",
        base_url.trim_end_matches('/'),
        code
    ))
}

/// Local output path for a service: `<output_dir>/<code>/index.json`.
pub fn output_path(output_dir: &Path, code: &str) -> PathBuf {
    output_dir.join(sanitize_service_code(code)).join("index.json")
}

/// Resolve service codes into resources.
///
/// `subset = None` selects every service in the index. An explicit subset
/// preserves the caller's order; unknown codes are logged and skipped, and
/// a fully unknown subset is an error.
pub fn resources_for(
    index: &OfferIndex,
    base_url: &str,
    output_dir: &Path,
    subset: Option<&[String]>,
) -> Result<Vec<Resource>> {
    let codes: Vec<String> = match subset {
        None => index.service_codes(),
        Some(requested) => {
            let mut known = Vec::with_capacity(requested.len());
            for code in requested {
                if index.offers.contains_key(code) {
                    known.push(code.clone());
                } else {
                    tracing::warn!(service = %code, "unknown service code, skipping");
                }
            }
            if known.is_empty() {
                anyhow::bail!("none of the requested service codes exist in the offer index");
            }
            known
        }
    };

    codes
        .into_iter()
        .map(|code| {
            let url = service_url(base_url, &code, index.offers.get(&code))?;
            let output_path = output_path(output_dir, &code);
            Ok(Resource {
                id: code,
                url,
                output_path,
            })
        })
        .collect()
}
