//! In-memory segment store. Peak memory grows with the number of committed
//! slots, so it suits short resources and tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Mutex, PoisonError};

use super::{SegmentSlot, SegmentStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<usize, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Vec<u8>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct MemorySlot<'a> {
    store: &'a MemoryStore,
    index: usize,
    buf: Vec<u8>,
}

impl Write for MemorySlot<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SegmentSlot for MemorySlot<'_> {
    fn commit(self: Box<Self>) -> io::Result<u64> {
        let len = self.buf.len() as u64;
        self.store.slots().insert(self.index, self.buf);
        Ok(len)
    }
}

impl SegmentStore for MemoryStore {
    fn put(&self, index: usize) -> io::Result<Box<dyn SegmentSlot + '_>> {
        Ok(Box::new(MemorySlot {
            store: self,
            index,
            buf: Vec::new(),
        }))
    }

    fn get(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError> {
        let data = self
            .slots()
            .get(&index)
            .cloned()
            .ok_or(StoreError::Missing { index })?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn remove(&self, index: usize) -> io::Result<()> {
        self.slots().remove(&index);
        Ok(())
    }

    fn contains(&self, index: usize) -> bool {
        self.slots().contains_key(&index)
    }

    fn len(&self) -> usize {
        self.slots().len()
    }

    fn clear(&self) -> io::Result<()> {
        self.slots().clear();
        Ok(())
    }

    fn release(&self) -> io::Result<()> {
        self.clear()
    }
}
