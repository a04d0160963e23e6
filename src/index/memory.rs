//! In-memory ordered index implementation.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::heap::{Rid, RowCursor};
use crate::tx::Transaction;

use super::error::IndexError;
use super::{Iid, IndexFile};

/// An in-memory unique index: an ordered map from key bytes to rids.
///
/// The whole entry set is treated as a single leaf block, so entry
/// positions are plain ordinals. Cursors snapshot the rid sequence at
/// creation; entries added or removed afterwards are not reflected in
/// an open cursor.
pub struct MemoryIndex {
    entries: RwLock<BTreeMap<Bytes, Rid>>,
}

impl MemoryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the rid stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<Rid> {
        self.entries.read().get(key).copied()
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Cursor over a snapshot of a [`MemoryIndex`] range.
pub struct MemoryIndexCursor {
    rids: Vec<Rid>,
    pos: usize,
}

impl RowCursor for MemoryIndexCursor {
    type Error = IndexError;

    fn next(&mut self) -> Result<(), IndexError> {
        if self.pos < self.rids.len() {
            self.pos += 1;
        }
        Ok(())
    }

    fn rid(&self) -> Rid {
        self.rids.get(self.pos).copied().unwrap_or(Rid::INVALID)
    }

    fn is_end(&self) -> bool {
        self.pos >= self.rids.len()
    }
}

impl IndexFile for MemoryIndex {
    type Cursor = MemoryIndexCursor;

    fn leaf_begin(&self) -> Iid {
        Iid::new(0, 0)
    }

    fn leaf_end(&self) -> Iid {
        Iid::new(0, self.entries.read().len() as u32)
    }

    fn scan(&self, from: Iid, to: Iid) -> MemoryIndexCursor {
        let entries = self.entries.read();
        let lo = (from.entry_no as usize).min(entries.len());
        let hi = (to.entry_no as usize).min(entries.len());
        let rids = entries
            .values()
            .skip(lo)
            .take(hi.saturating_sub(lo))
            .copied()
            .collect();
        MemoryIndexCursor { rids, pos: 0 }
    }

    fn insert_entry(&self, key: &[u8], rid: Rid, _txn: &Transaction) -> Result<(), IndexError> {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            return Err(IndexError::DuplicateKey(key.to_vec()));
        }
        entries.insert(Bytes::copy_from_slice(key), rid);
        Ok(())
    }

    fn delete_entry(&self, key: &[u8], _txn: &Transaction) -> Result<(), IndexError> {
        match self.entries.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(IndexError::KeyNotFound(key.to_vec())),
        }
    }
}
