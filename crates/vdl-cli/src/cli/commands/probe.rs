//! `vdl probe` – report size and range support of a URL.

use anyhow::{Context, Result};
use vdl_core::config::VdlConfig;
use vdl_core::probe::probe_with_retry;
use vdl_core::CancelToken;

use super::{mib, parse_headers};

pub async fn run_probe(cfg: &VdlConfig, url: &str, raw_headers: &[String]) -> Result<()> {
    let headers = cfg.request_headers(&parse_headers(raw_headers)?);
    let options = cfg.curl_options();
    let policy = cfg.retry_policy();
    let url_owned = url.to_string();
    let head = tokio::task::spawn_blocking(move || {
        probe_with_retry(&url_owned, &headers, &options, &policy, &CancelToken::new())
    })
    .await
    .context("probe task panicked")?
    .with_context(|| format!("probe failed for {}", url))?;

    match head.content_length {
        Some(n) => println!("Size:          {} bytes ({:.1} MiB)", n, mib(n)),
        None => println!("Size:          unknown"),
    }
    println!(
        "Range support: {}",
        if head.accept_ranges { "yes" } else { "not advertised" }
    );
    if let Some(n) = head.content_length.filter(|n| *n > 0) {
        let segments = n.div_ceil(cfg.chunk_size);
        println!(
            "Segments:      {} x {:.1} MiB",
            segments,
            mib(cfg.chunk_size)
        );
    }
    Ok(())
}
