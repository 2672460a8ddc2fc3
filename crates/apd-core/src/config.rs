use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per resource (including the first).
    pub max_retries: u32,
    /// Base backoff delay in seconds; doubles per attempt.
    pub min_wait_secs: f64,
    /// Upper bound on backoff delay in seconds, jitter included.
    pub max_wait_secs: f64,
    /// HTTP statuses eligible for retry with backoff.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_wait_secs: 2.0,
            max_wait_secs: 120.0,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Global configuration loaded from `~/.config/apd/config.toml`.
///
/// Immutable after construction; the downloader takes a copy and never
/// consults global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApdConfig {
    /// Base URL of the offer catalog (the offer index lives at `<base_url>/index.json`).
    pub base_url: String,
    /// Directory receiving one `<service>/index.json` per resource plus sidecar records.
    pub output_dir: PathBuf,
    /// Maximum concurrent in-flight fetches.
    pub max_concurrent: usize,
    /// Maximum pooled HTTP handles (upper bound on open connections).
    pub pool_size: usize,
    /// Transfer buffer size in bytes; bounds per-chunk memory while streaming.
    pub chunk_size: usize,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort a transfer when no data arrives for this many seconds.
    pub read_timeout_secs: u64,
    /// Hard wall-clock limit per request in seconds.
    pub total_timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Compare stored digests against re-fetched content and verify commits.
    pub verify_integrity: bool,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for ApdConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws".to_string(),
            output_dir: PathBuf::from("pricing-data"),
            max_concurrent: 50,
            pool_size: 100,
            chunk_size: 64 * 1024,
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            total_timeout_secs: 600,
            user_agent: default_user_agent(),
            verify_integrity: true,
            retry: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("apd/{}", env!("CARGO_PKG_VERSION"))
}

impl ApdConfig {
    /// Effective retry settings: the `[retry]` section or built-in defaults.
    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .with_context(|| format!("invalid base_url: {}", self.base_url))?;
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        if self.pool_size == 0 {
            anyhow::bail!("pool_size must be at least 1");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        let retry = self.retry();
        if retry.max_retries == 0 {
            anyhow::bail!("retry.max_retries must be at least 1");
        }
        if retry.min_wait_secs < 0.0 || retry.max_wait_secs < retry.min_wait_secs {
            anyhow::bail!(
                "retry wait bounds invalid: min {} max {}",
                retry.min_wait_secs,
                retry.max_wait_secs
            );
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("apd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ApdConfig> {
    let path = config_path()?;
    load_or_init_at(&path)
}

/// Like `load_or_init` but with an explicit path (used by tests).
pub fn load_or_init_at(path: &Path) -> Result<ApdConfig> {
    if !path.exists() {
        let default_cfg = ApdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: ApdConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ApdConfig::default();
        assert_eq!(
            cfg.base_url,
            "https://pricing.us-east-1.amazonaws.com/offers/v1.0/aws"
        );
        assert_eq!(cfg.max_concurrent, 50);
        assert_eq!(cfg.pool_size, 100);
        assert_eq!(cfg.chunk_size, 65536);
        assert_eq!(cfg.connect_timeout_secs, 10);
        assert_eq!(cfg.read_timeout_secs, 30);
        assert_eq!(cfg.total_timeout_secs, 600);
        assert!(cfg.verify_integrity);
        assert!(cfg.retry.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn default_retry_values() {
        let retry = ApdConfig::default().retry();
        assert_eq!(retry.max_retries, 5);
        assert!((retry.min_wait_secs - 2.0).abs() < 1e-9);
        assert!((retry.max_wait_secs - 120.0).abs() < 1e-9);
        assert_eq!(retry.retryable_statuses, vec![429, 500, 502, 503, 504]);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ApdConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ApdConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.base_url, cfg.base_url);
        assert_eq!(parsed.max_concurrent, cfg.max_concurrent);
        assert_eq!(parsed.pool_size, cfg.pool_size);
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
        assert_eq!(parsed.verify_integrity, cfg.verify_integrity);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            max_concurrent = 4
            output_dir = "/tmp/pricing"
        "#;
        let cfg: ApdConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent, 4);
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/pricing"));
        assert_eq!(cfg.pool_size, 100);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            max_concurrent = 8

            [retry]
            max_retries = 3
            min_wait_secs = 0.5
            max_wait_secs = 15.0
            retryable_statuses = [429, 503]
        "#;
        let cfg: ApdConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_retries, 3);
        assert!((retry.min_wait_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.retryable_statuses, vec![429, 503]);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut cfg = ApdConfig::default();
        cfg.max_concurrent = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_wait_bounds() {
        let mut cfg = ApdConfig::default();
        cfg.retry = Some(RetryConfig {
            min_wait_secs: 10.0,
            max_wait_secs: 1.0,
            ..RetryConfig::default()
        });
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut cfg = ApdConfig::default();
        cfg.base_url = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }
}
