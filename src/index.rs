//! Ordered secondary indexes.
//!
//! An index maps fixed-width key bytes (the concatenation of the
//! indexed columns, no separator, no length prefix) to a [`Rid`].
//! [`IndexFile`] is the contract the execution layer sees; positions
//! inside the ordered entry space are named by [`Iid`], and range
//! cursors implement the shared
//! [`RowCursor`](crate::heap::RowCursor) capability so scan operators
//! can drive heap and index cursors through one interface.
//!
//! [`MemoryIndex`] is the in-crate implementation; a B+-tree file
//! plugs in behind the same trait.

pub mod error;
pub mod memory;

use std::fmt;

use crate::heap::{Rid, RowCursor};
use crate::tx::Transaction;

pub use error::IndexError;
pub use memory::MemoryIndex;

/// Position of one entry in an index's ordered leaf space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iid {
    /// Leaf block number.
    pub block_no: u32,
    /// Entry position within the block.
    pub entry_no: u32,
}

impl Iid {
    /// Creates an entry position.
    pub const fn new(block_no: u32, entry_no: u32) -> Self {
        Self { block_no, entry_no }
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.block_no, self.entry_no)
    }
}

/// A handle to one secondary index.
///
/// Keys are unique: inserting an existing key or deleting a missing
/// one is an error. The `txn` parameter lets transactional index
/// implementations attribute structure modifications; the in-memory
/// implementation ignores it.
pub trait IndexFile {
    /// Cursor type produced by [`scan`](Self::scan).
    type Cursor: RowCursor<Error = IndexError>;

    /// Returns the position of the first entry.
    fn leaf_begin(&self) -> Iid;

    /// Returns the position one past the last entry.
    fn leaf_end(&self) -> Iid;

    /// Returns a cursor over entries in `[from, to)` in key order.
    fn scan(&self, from: Iid, to: Iid) -> Self::Cursor;

    /// Inserts `key -> rid`.
    fn insert_entry(&self, key: &[u8], rid: Rid, txn: &Transaction) -> Result<(), IndexError>;

    /// Removes the entry for `key`.
    fn delete_entry(&self, key: &[u8], txn: &Transaction) -> Result<(), IndexError>;
}
