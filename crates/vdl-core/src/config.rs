use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::{CurlOptions, DEFAULT_READ_INCREMENT};
use crate::retry::RetryPolicy;
use crate::scheduler::DEFAULT_MAX_WORKERS;
use crate::segmenter::DEFAULT_SEGMENT_SIZE;

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Delay in seconds after the first failed attempt; attempt n waits n times this.
    pub base_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
        }
    }
}

/// Where fetched segments wait for reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One scratch file per segment; memory stays bounded for any file size.
    #[default]
    Disk,
    /// Segments held in memory until reassembly.
    Memory,
}

/// Global configuration loaded from `~/.config/vdl/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdlConfig {
    /// Bytes per segment.
    pub chunk_size: u64,
    /// Bytes per streaming read while a segment downloads.
    pub stream_read_increment: usize,
    /// Maximum concurrent segment fetches.
    pub max_workers: usize,
    /// Connect timeout and stall window for segment transfers, in seconds; hard limit for the size probe.
    pub request_timeout_secs: u64,
    /// Segment store backing: "disk" (default) or "memory".
    pub store_backend: StoreBackend,
    /// Parent directory for the scratch store; defaults to the output file's directory.
    pub scratch_dir: Option<PathBuf>,
    pub retry: RetryConfig,
    /// Request headers sent with every probe and segment request.
    pub headers: BTreeMap<String, String>,
}

fn default_headers() -> BTreeMap<String, String> {
    [
        ("accept", "*/*"),
        ("accept-language", "en-US,en;q=0.9"),
        (
            "user-agent",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for VdlConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_SEGMENT_SIZE,
            stream_read_increment: DEFAULT_READ_INCREMENT,
            max_workers: DEFAULT_MAX_WORKERS,
            request_timeout_secs: 30,
            store_backend: StoreBackend::Disk,
            scratch_dir: None,
            retry: RetryConfig::default(),
            headers: default_headers(),
        }
    }
}

impl VdlConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.stream_read_increment > 0,
            "stream_read_increment must be positive"
        );
        anyhow::ensure!(self.max_workers > 0, "max_workers must be positive");
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );
        anyhow::ensure!(self.retry.max_attempts > 0, "retry.max_attempts must be positive");
        anyhow::ensure!(
            self.retry.base_delay_secs.is_finite() && self.retry.base_delay_secs >= 0.0,
            "retry.base_delay_secs must be a non-negative number"
        );
        Ok(())
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            read_increment: self.stream_read_increment,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    /// Configured headers merged with `extra`; entries in `extra` win
    /// (compared case-insensitively).
    pub fn request_headers(&self, extra: &HashMap<String, String>) -> HashMap<String, String> {
        let mut out: HashMap<String, String> = self
            .headers
            .iter()
            .filter(|(k, _)| !extra.keys().any(|e| e.eq_ignore_ascii_case(k)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load and validate configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<VdlConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: VdlConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
