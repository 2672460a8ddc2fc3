//! `apd list` – show the service codes in the offer index.

use anyhow::Result;
use apd_core::config::ApdConfig;
use apd_core::control::CancelToken;
use apd_core::downloader::Downloader;
use std::sync::Arc;

pub async fn run_list(cfg: ApdConfig) -> Result<()> {
    let downloader = Arc::new(Downloader::new(cfg)?);
    let cancel = CancelToken::new();
    let index = downloader.fetch_index(&cancel).await?;
    let codes = index.service_codes();
    for code in &codes {
        println!("{}", code);
    }
    println!("{} services", codes.len());
    Ok(())
}
