//! On-disk segment store: one file per segment index under a scratch directory.
//!
//! A slot is written to `segment_<i>.part` and renamed to `segment_<i>` on
//! commit, so a half-written attempt is never mistaken for finished data.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::TempDir;

use super::{SegmentSlot, SegmentStore, StoreError};

/// Prefix of the scratch directory created next to the output file.
pub const SCRATCH_PREFIX: &str = ".vdl-segments-";

const SLOT_BUFFER_BYTES: usize = 64 * 1024;

pub struct DiskStore {
    dir: PathBuf,
    scratch: Mutex<Option<TempDir>>,
}

impl DiskStore {
    /// Create a fresh scratch directory inside `parent`.
    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)?;
        tracing::debug!(dir = %scratch.path().display(), "created scratch store");
        Ok(DiskStore {
            dir: scratch.path().to_path_buf(),
            scratch: Mutex::new(Some(scratch)),
        })
    }

    /// Path of the scratch directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("segment_{}", index))
    }

    fn partial_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("segment_{}.part", index))
    }
}

struct DiskSlot {
    file: BufWriter<File>,
    partial: PathBuf,
    committed: PathBuf,
    written: u64,
}

impl Write for DiskSlot {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.file.write(data)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl SegmentSlot for DiskSlot {
    fn commit(self: Box<Self>) -> io::Result<u64> {
        let DiskSlot {
            file,
            partial,
            committed,
            written,
        } = *self;
        let file = file.into_inner().map_err(|e| e.into_error())?;
        drop(file);
        fs::rename(&partial, &committed)?;
        Ok(written)
    }
}

impl SegmentStore for DiskStore {
    fn put(&self, index: usize) -> io::Result<Box<dyn SegmentSlot + '_>> {
        let partial = self.partial_path(index);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial)?;
        Ok(Box::new(DiskSlot {
            file: BufWriter::with_capacity(SLOT_BUFFER_BYTES, file),
            partial,
            committed: self.slot_path(index),
            written: 0,
        }))
    }

    fn get(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError> {
        match File::open(self.slot_path(index)) {
            Ok(f) => Ok(Box::new(BufReader::with_capacity(SLOT_BUFFER_BYTES, f))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Missing { index }),
            Err(source) => Err(StoreError::Io { index, source }),
        }
    }

    fn remove(&self, index: usize) -> io::Result<()> {
        for path in [self.slot_path(index), self.partial_path(index)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn contains(&self, index: usize) -> bool {
        self.slot_path(index).is_file()
    }

    fn len(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().extension().is_none())
                    .count()
            })
            .unwrap_or(0)
    }

    fn clear(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            fs::remove_file(entry?.path())?;
        }
        Ok(())
    }

    fn release(&self) -> io::Result<()> {
        let scratch = self
            .scratch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match scratch {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
