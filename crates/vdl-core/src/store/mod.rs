//! Scratch storage for fetched segments.
//!
//! A `SegmentStore` holds one slot per segment index. Fetch workers write
//! slots concurrently (each index has exactly one writer), the reassembler
//! reads them back in index order once every fetch has been joined.

mod disk;
mod memory;

use std::io::{self, Read, Write};
use std::path::Path;

pub use disk::{DiskStore, SCRATCH_PREFIX};
pub use memory::MemoryStore;

/// Error reading a slot back out of the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("segment {index} is not in the store")]
    Missing { index: usize },
    #[error("segment {index}: {source}")]
    Io {
        index: usize,
        #[source]
        source: io::Error,
    },
}

/// An open slot being filled by one fetch attempt.
///
/// Bytes become visible to `get` only after `commit`; a slot dropped without
/// committing leaves the previously committed state (if any) untouched.
pub trait SegmentSlot: Write + Send {
    /// Publish the written bytes as the segment's data. Returns the byte count.
    fn commit(self: Box<Self>) -> io::Result<u64>;
}

/// Addressable holding area for segment bytes, keyed by segment index.
pub trait SegmentStore: Send + Sync {
    /// Open a fresh, empty slot for `index`. Anything a previous attempt wrote
    /// is discarded, so a retry overwrites instead of appending.
    fn put(&self, index: usize) -> io::Result<Box<dyn SegmentSlot + '_>>;

    /// Read back the committed bytes of `index`.
    fn get(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError>;

    /// Delete the slot for `index`. Removing an absent slot is not an error.
    fn remove(&self, index: usize) -> io::Result<()>;

    /// True if `index` has committed data.
    fn contains(&self, index: usize) -> bool;

    /// Number of committed slots.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard every slot, committed or not.
    fn clear(&self) -> io::Result<()>;

    /// Tear down the backing medium (e.g. remove the scratch directory).
    fn release(&self) -> io::Result<()>;

    /// Filesystem location of the backing medium, if it has one.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Yields `(index, reader)` for every index in `[0, segment_count)`, ascending.
/// An absent slot yields `StoreError::Missing`.
pub fn drain_in_order(
    store: &dyn SegmentStore,
    segment_count: usize,
) -> impl Iterator<Item = Result<(usize, Box<dyn Read + '_>), StoreError>> + '_ {
    (0..segment_count).map(move |index| store.get(index).map(|reader| (index, reader)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(store: &dyn SegmentStore, index: usize, data: &[u8]) {
        let mut slot = store.put(index).unwrap();
        slot.write_all(data).unwrap();
        assert_eq!(slot.commit().unwrap(), data.len() as u64);
    }

    fn drain_to_vec(store: &dyn SegmentStore, count: usize) -> Result<Vec<u8>, StoreError> {
        let mut out = Vec::new();
        for item in drain_in_order(store, count) {
            let (_, mut reader) = item?;
            reader.read_to_end(&mut out).unwrap();
        }
        Ok(out)
    }

    fn check_ordered_drain(store: &dyn SegmentStore) {
        // Written out of order, read back in index order.
        fill(store, 2, b"cc");
        fill(store, 0, b"aaa");
        fill(store, 1, b"b");
        assert_eq!(store.len(), 3);
        assert_eq!(drain_to_vec(store, 3).unwrap(), b"aaabcc");
    }

    fn check_missing(store: &dyn SegmentStore) {
        fill(store, 0, b"x");
        let err = drain_to_vec(store, 2).unwrap_err();
        assert!(matches!(err, StoreError::Missing { index: 1 }));
    }

    fn check_retry_overwrites(store: &dyn SegmentStore) {
        {
            let mut slot = store.put(0).unwrap();
            slot.write_all(b"partial-garbage").unwrap();
            // dropped without commit: failed attempt
        }
        assert!(!store.contains(0));
        fill(store, 0, b"good");
        assert_eq!(drain_to_vec(store, 1).unwrap(), b"good");
    }

    fn check_remove_and_clear(store: &dyn SegmentStore) {
        fill(store, 0, b"a");
        fill(store, 1, b"b");
        store.remove(0).unwrap();
        store.remove(0).unwrap();
        assert!(!store.contains(0));
        assert!(store.contains(1));
        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn memory_store_contract() {
        check_ordered_drain(&MemoryStore::new());
        check_missing(&MemoryStore::new());
        check_retry_overwrites(&MemoryStore::new());
        check_remove_and_clear(&MemoryStore::new());
    }

    #[test]
    fn disk_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        check_ordered_drain(&DiskStore::create_in(dir.path()).unwrap());
        check_missing(&DiskStore::create_in(dir.path()).unwrap());
        check_retry_overwrites(&DiskStore::create_in(dir.path()).unwrap());
        check_remove_and_clear(&DiskStore::create_in(dir.path()).unwrap());
    }

    #[test]
    fn concurrent_writes_to_distinct_indices() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskStore::create_in(dir.path()).unwrap();
        let memory = MemoryStore::new();
        for store in [&disk as &dyn SegmentStore, &memory] {
            std::thread::scope(|s| {
                for i in 0..8u8 {
                    s.spawn(move || fill(store, i as usize, &[i; 1000]));
                }
            });
            let out = drain_to_vec(store, 8).unwrap();
            assert_eq!(out.len(), 8000);
            for (i, chunk) in out.chunks(1000).enumerate() {
                assert!(chunk.iter().all(|b| *b == i as u8));
            }
        }
    }
}
