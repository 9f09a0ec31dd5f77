//! `vdl get` – resolve, probe and download one resource.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use vdl_core::config::VdlConfig;
use vdl_core::probe::{probe_with_retry, require_total_size};
use vdl_core::scheduler::{Phase, ProgressStats};
use vdl_core::select::{select_stream, StreamCriteria, StreamManifest};
use vdl_core::url_model::derive_output_filename;
use vdl_core::{CancelToken, DownloadError, DownloadPlan, Downloader};

use super::{mib, parse_headers};

const PROGRESS_INTERVAL_MS: u128 = 500;

/// Arguments of `vdl get` after config overrides are applied.
#[derive(Debug)]
pub struct GetRequest {
    pub url: Option<String>,
    pub manifest: Option<PathBuf>,
    pub quality: StreamCriteria,
    pub output: Option<PathBuf>,
    pub size: Option<u64>,
    pub headers: Vec<String>,
}

/// Resource URL and title hint from either the positional URL or a manifest.
fn resolve_source(req: &GetRequest) -> Result<(String, Option<String>)> {
    if let Some(path) = &req.manifest {
        let manifest = StreamManifest::load(path)?;
        let stream = select_stream(&manifest.streams, req.quality)
            .with_context(|| format!("no stream in {} matches '{}'", path.display(), req.quality))?;
        println!("Selected stream: {}", stream.describe());
        return Ok((stream.url.clone(), manifest.title.clone()));
    }
    let url = req.url.clone().context("a URL or --manifest is required")?;
    Ok((url, None))
}

fn render(stats: &ProgressStats) {
    let label = match stats.phase {
        Phase::Fetching => "fetch",
        Phase::Reassembling => "write",
    };
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    println!(
        "\r  {} {:.1} / {:.1} MiB ({:.1}%)  {}/{} segments  {:.2} MiB/s  ETA {}  ",
        label,
        mib(stats.phase_bytes()),
        mib(stats.total_bytes),
        stats.fraction() * 100.0,
        stats.segments_done,
        stats.segment_count,
        stats.bytes_per_sec() / 1_048_576.0,
        eta
    );
}

pub async fn run_get(cfg: &VdlConfig, req: GetRequest) -> Result<()> {
    let (url, title) = resolve_source(&req)?;
    let headers = cfg.request_headers(&parse_headers(&req.headers)?);
    let output = req
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(derive_output_filename(title.as_deref(), &url)));

    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted, stopping workers...");
                cancel.cancel();
            }
        })
    };

    let total_size = match req.size {
        Some(n) => n,
        None => {
            let (url, headers) = (url.clone(), headers.clone());
            let (options, policy, cancel) = (cfg.curl_options(), cfg.retry_policy(), cancel.clone());
            let head = tokio::task::spawn_blocking(move || {
                probe_with_retry(&url, &headers, &options, &policy, &cancel)
            })
            .await
            .context("probe task panicked")?
            .context("size probe failed")?;
            if !head.accept_ranges {
                tracing::warn!("server does not advertise byte ranges");
            }
            require_total_size(&head)?
        }
    };

    let plan = DownloadPlan::new(url, total_size, cfg.chunk_size, headers);
    println!(
        "Downloading {} ({:.1} MiB, {} segments) -> {}",
        plan.resource_url,
        mib(total_size),
        plan.segment_count(),
        output.display()
    );

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<ProgressStats>();
    let progress_handle = tokio::spawn(async move {
        let mut last_print: Option<(Instant, Phase)> = None;
        while let Some(stats) = progress_rx.recv().await {
            let now = Instant::now();
            let due = match last_print {
                None => true,
                Some((at, phase)) => {
                    phase != stats.phase
                        || now.duration_since(at).as_millis() >= PROGRESS_INTERVAL_MS
                        || stats.is_complete()
                }
            };
            if due {
                render(&stats);
                last_print = Some((now, stats.phase));
            }
        }
    });

    let downloader = Downloader::from_config(cfg);
    let started = Instant::now();
    let outcome = {
        let cancel = cancel.clone();
        let output = output.clone();
        tokio::task::spawn_blocking(move || {
            let report = |stats: &ProgressStats| {
                let _ = progress_tx.send(stats.clone());
            };
            downloader.download(&plan, &output, &cancel, Some(&report))
        })
        .await
        .context("download task panicked")?
    };
    let _ = progress_handle.await;
    ctrl_c.abort();

    match outcome {
        Ok(result) => {
            println!(
                "Saved {} ({} bytes in {:.1}s)",
                result.output_path.display(),
                result.bytes_written,
                started.elapsed().as_secs_f64()
            );
            Ok(())
        }
        Err(DownloadError::Cancelled) => anyhow::bail!("download cancelled; nothing was written"),
        Err(e) => Err(e).with_context(|| format!("download of {} failed", output.display())),
    }
}
