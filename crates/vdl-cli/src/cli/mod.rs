//! CLI for the vdl segmented downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vdl_core::config::{self, VdlConfig};
use vdl_core::select::StreamCriteria;

use commands::{run_get, run_pick, run_probe, GetRequest};

/// Top-level CLI for vdl.
#[derive(Debug, Parser)]
#[command(name = "vdl")]
#[command(about = "vdl: concurrent range-segmented video downloader", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/vdl/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a resource in parallel byte-range segments.
    Get {
        /// Direct HTTP/HTTPS URL of the media resource.
        #[arg(required_unless_present = "manifest", conflicts_with = "manifest")]
        url: Option<String>,

        /// Stream manifest (JSON) to pick the resource from.
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Which stream to take from the manifest: best, worst, index:N, max:W.
        #[arg(short, long, default_value = "best")]
        quality: StreamCriteria,

        /// Output file. Defaults to a name derived from the title or URL.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Total size in bytes; skips the size probe.
        #[arg(long, value_name = "BYTES")]
        size: Option<u64>,

        /// Extra request header, e.g. -H 'Referer: https://example.com/'. Repeatable.
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Concurrent segment fetches.
        #[arg(short, long, value_name = "N")]
        workers: Option<usize>,

        /// Bytes per segment.
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,

        /// Attempts per segment, including the first.
        #[arg(long, value_name = "N")]
        retries: Option<u32>,

        /// Base backoff delay in seconds (attempt n waits n times this).
        #[arg(long, value_name = "SECS")]
        retry_delay: Option<f64>,

        /// Keep segments in memory instead of a scratch directory.
        #[arg(long)]
        memory: bool,
    },

    /// Show size and range support of a URL.
    Probe {
        url: String,

        /// Extra request header. Repeatable.
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,
    },

    /// List the streams in a manifest and print the one a quality selects.
    Pick {
        /// Stream manifest (JSON).
        manifest: PathBuf,

        #[arg(short, long, default_value = "best")]
        quality: StreamCriteria,
    },
}

fn load_config(path: Option<&Path>) -> Result<VdlConfig> {
    match path {
        Some(p) => config::load_from(p),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                manifest,
                quality,
                output,
                size,
                headers,
                workers,
                chunk_size,
                retries,
                retry_delay,
                memory,
            } => {
                let mut cfg = cfg;
                if let Some(n) = workers {
                    cfg.max_workers = n;
                }
                if let Some(n) = chunk_size {
                    cfg.chunk_size = n;
                }
                if let Some(n) = retries {
                    cfg.retry.max_attempts = n;
                }
                if let Some(secs) = retry_delay {
                    cfg.retry.base_delay_secs = secs;
                }
                if memory {
                    cfg.store_backend = config::StoreBackend::Memory;
                }
                cfg.validate()?;
                run_get(
                    &cfg,
                    GetRequest {
                        url,
                        manifest,
                        quality,
                        output,
                        size,
                        headers,
                    },
                )
                .await?
            }
            CliCommand::Probe { url, headers } => run_probe(&cfg, &url, &headers).await?,
            CliCommand::Pick { manifest, quality } => run_pick(&manifest, quality)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
