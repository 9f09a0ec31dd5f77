//! Ordered reassembly of fetched segments into the output file.
//!
//! Segments are appended to `<output>.part` in index order, each store slot
//! is removed as soon as it has been copied, and the finished file is renamed
//! over the final path. Any failure removes the partial file, so the output
//! path never holds a truncated artifact.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::DownloadError;
use crate::scheduler::{Phase, ProgressFn, ProgressStats};
use crate::store::{drain_in_order, SegmentStore, StoreError};

/// Suffix of the in-progress output file.
pub const PARTIAL_SUFFIX: &str = ".part";

const OUTPUT_BUFFER_BYTES: usize = 1024 * 1024;

/// Path of the in-progress output: appends `.part` (`video.mp4` → `video.mp4.part`).
pub fn partial_output_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(PARTIAL_SUFFIX);
    PathBuf::from(o)
}

/// Result of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub output_path: PathBuf,
    pub bytes_written: u64,
}

/// Concatenate slots `0..segment_count` from `store` into `output_path`.
///
/// Must only be called after every segment is confirmed done. `total_size`
/// is used for progress reporting: `bytes_done` stays at `total_size` and
/// `bytes_written` counts the output.
pub fn reassemble(
    store: &dyn SegmentStore,
    segment_count: usize,
    total_size: u64,
    output_path: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<DownloadResult, DownloadError> {
    let partial = partial_output_path(output_path);
    match write_segments(store, segment_count, total_size, &partial, progress) {
        Ok(bytes_written) => {
            if let Err(source) = fs::rename(&partial, output_path) {
                remove_partial(&partial);
                return Err(DownloadError::ReassemblyIoFailed {
                    path: output_path.to_path_buf(),
                    source,
                });
            }
            tracing::info!(path = %output_path.display(), bytes = bytes_written, "output written");
            Ok(DownloadResult {
                output_path: output_path.to_path_buf(),
                bytes_written,
            })
        }
        Err(e) => {
            remove_partial(&partial);
            Err(e)
        }
    }
}

fn write_segments(
    store: &dyn SegmentStore,
    segment_count: usize,
    total_size: u64,
    partial: &Path,
    progress: Option<ProgressFn<'_>>,
) -> Result<u64, DownloadError> {
    let io_err = |source: io::Error| DownloadError::ReassemblyIoFailed {
        path: partial.to_path_buf(),
        source,
    };
    let started = Instant::now();

    // Single run per output path: a stale .part from an earlier crash is overwritten.
    let file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(partial)
        .map_err(io_err)?;
    let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_BYTES, file);
    let mut written = 0u64;

    for item in drain_in_order(store, segment_count) {
        let (index, mut reader) = item.map_err(|e| match e {
            StoreError::Missing { index } => DownloadError::MissingSegment { index },
            StoreError::Io { source, .. } => io_err(source),
        })?;
        written += io::copy(&mut reader, &mut out).map_err(io_err)?;
        drop(reader);

        if let Err(e) = store.remove(index) {
            tracing::warn!(segment = index, error = %e, "could not remove scratch segment");
        }
        if let Some(report) = progress {
            report(&ProgressStats {
                phase: Phase::Reassembling,
                bytes_done: total_size,
                bytes_written: written,
                total_bytes: total_size,
                elapsed_secs: started.elapsed().as_secs_f64(),
                segments_done: index + 1,
                segment_count,
            });
        }
    }

    let file = out.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    Ok(written)
}

fn remove_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %partial.display(), error = %e, "could not remove partial output")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DiskStore, MemoryStore};
    use std::cell::RefCell;
    use std::io::Write;

    fn fill(store: &dyn SegmentStore, index: usize, data: &[u8]) {
        let mut slot = store.put(index).unwrap();
        slot.write_all(data).unwrap();
        slot.commit().unwrap();
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_output_path(Path::new("/tmp/video.mp4")),
            PathBuf::from("/tmp/video.mp4.part")
        );
    }

    #[test]
    fn concatenates_in_index_order_and_empties_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::create_in(dir.path()).unwrap();
        fill(&store, 2, b"!");
        fill(&store, 0, b"hello ");
        fill(&store, 1, b"world");
        let out = dir.path().join("out.bin");

        let seen = RefCell::new(Vec::new());
        let result = reassemble(
            &store,
            3,
            12,
            &out,
            Some(&|s: &ProgressStats| seen.borrow_mut().push((s.bytes_done, s.bytes_written))),
        )
        .unwrap();

        assert_eq!(result.output_path, out);
        assert_eq!(result.bytes_written, 12);
        assert_eq!(fs::read(&out).unwrap(), b"hello world!");
        assert!(store.is_empty());
        assert!(!partial_output_path(&out).exists());
        assert_eq!(seen.into_inner(), vec![(12, 6), (12, 11), (12, 12)]);
    }

    #[test]
    fn missing_segment_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        fill(&store, 0, b"abc");
        fill(&store, 2, b"ghi");
        let out = dir.path().join("out.bin");
        let err = reassemble(&store, 3, 9, &out, None).unwrap_err();
        assert!(matches!(err, DownloadError::MissingSegment { index: 1 }));
        assert!(!out.exists());
        assert!(!partial_output_path(&out).exists());
    }

    #[test]
    fn unwritable_output_is_reassembly_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        fill(&store, 0, b"abc");
        let out = dir.path().join("no-such-dir").join("out.bin");
        let err = reassemble(&store, 1, 3, &out, None).unwrap_err();
        assert!(matches!(err, DownloadError::ReassemblyIoFailed { .. }));
        assert!(!err.is_fetch_failure());
        // the slot is still there: nothing was drained
        assert!(store.contains(0));
    }
}
