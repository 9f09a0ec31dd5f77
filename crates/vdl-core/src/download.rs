//! One-call download: plan → concurrent fetch → ordered reassembly.
//!
//! `Downloader` owns the fetcher and run options, opens a scratch store per
//! run and always releases it, whether the run succeeded or not.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::config::{StoreBackend, VdlConfig};
use crate::error::DownloadError;
use crate::fetcher::{CurlTransport, RangeFetcher};
use crate::reassemble::{reassemble, DownloadResult};
use crate::scheduler::{schedule, ProgressFn, DEFAULT_MAX_WORKERS};
use crate::segmenter::DownloadPlan;
use crate::store::{DiskStore, MemoryStore, SegmentStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub max_workers: usize,
    pub store_backend: StoreBackend,
    /// Parent of the scratch store; `None` means next to the output file.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            store_backend: StoreBackend::Disk,
            scratch_dir: None,
        }
    }
}

pub struct Downloader {
    fetcher: RangeFetcher,
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(fetcher: RangeFetcher, options: DownloadOptions) -> Self {
        Self { fetcher, options }
    }

    /// Curl-backed downloader with limits and retry policy from `config`.
    pub fn from_config(config: &VdlConfig) -> Self {
        let transport = CurlTransport::new(config.curl_options());
        Self::new(
            RangeFetcher::new(Arc::new(transport), config.retry_policy()),
            DownloadOptions {
                max_workers: config.max_workers,
                store_backend: config.store_backend,
                scratch_dir: config.scratch_dir.clone(),
            },
        )
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Download `plan` into `output_path`.
    ///
    /// The output file appears only when every segment was fetched and
    /// written; on any error there is neither output nor scratch data left.
    pub fn download(
        &self,
        plan: &DownloadPlan,
        output_path: &Path,
        cancel: &CancelToken,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<DownloadResult, DownloadError> {
        plan.validate()?;
        let store = self.open_store(output_path)?;
        let result = self.run(plan, store.as_ref(), output_path, cancel, progress);
        if let Err(e) = store.release() {
            tracing::warn!(error = %e, "could not release scratch store");
        }
        result
    }

    fn run(
        &self,
        plan: &DownloadPlan,
        store: &dyn SegmentStore,
        output_path: &Path,
        cancel: &CancelToken,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<DownloadResult, DownloadError> {
        let report = schedule(
            plan,
            self.options.max_workers,
            &self.fetcher,
            store,
            cancel,
            progress,
        )?;
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        reassemble(
            store,
            report.segment_count,
            plan.total_size,
            output_path,
            progress,
        )
    }

    fn open_store(&self, output_path: &Path) -> Result<Box<dyn SegmentStore>, DownloadError> {
        match self.options.store_backend {
            StoreBackend::Memory => Ok(Box::new(MemoryStore::new())),
            StoreBackend::Disk => {
                let parent = self
                    .options
                    .scratch_dir
                    .clone()
                    .unwrap_or_else(|| output_parent(output_path));
                let store = DiskStore::create_in(&parent)
                    .map_err(|source| DownloadError::Scratch { path: parent, source })?;
                Ok(Box::new(store))
            }
        }
    }
}

fn output_parent(output_path: &Path) -> PathBuf {
    match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
