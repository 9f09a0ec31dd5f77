//! Segmented range downloader.
//!
//! A resource of known size is split into fixed-size byte ranges, fetched
//! concurrently on a bounded worker pool with per-segment retry, held in a
//! scratch store and reassembled in order into the output file.

pub mod cancel;
pub mod config;
pub mod download;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod probe;
pub mod reassemble;
pub mod retry;
pub mod scheduler;
pub mod segmenter;
pub mod select;
pub mod store;
pub mod url_model;

pub use cancel::CancelToken;
pub use download::{DownloadOptions, Downloader};
pub use error::DownloadError;
pub use reassemble::DownloadResult;
pub use segmenter::DownloadPlan;
