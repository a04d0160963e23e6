//! Transaction identity, 2PL state, and the per-transaction undo log.

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;

use crate::heap::{Record, Rid};

use super::lock::LockDataId;

/// Transaction ID (64-bit).
///
/// IDs are allocated sequentially starting from 1. ID 0 is reserved as
/// INVALID and doubles as the system transaction used for lock-free
/// bootstrap work such as index backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(u64);

impl TxnId {
    /// Invalid / system transaction ID (0).
    pub const INVALID: Self = Self(0);

    /// Creates a transaction ID.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Two-phase-locking state of a transaction.
///
/// The only legal sequence is a prefix of
/// `Growing -> Shrinking -> (Committed | Aborted)`: locks may be
/// acquired while growing and only released once shrinking begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Acquiring locks; no lock has been released yet.
    Growing,
    /// At least one lock released; no further acquisition allowed.
    Shrinking,
    /// Finished successfully.
    Committed,
    /// Rolled back.
    Aborted,
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxnState::Growing => "GROWING",
            TxnState::Shrinking => "SHRINKING",
            TxnState::Committed => "COMMITTED",
            TxnState::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// One undo log entry, appended by the mutation executors and consumed
/// in reverse order by rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRecord {
    /// A record was inserted at `rid`; undo deletes it.
    Insert {
        /// Table the record was inserted into.
        table: String,
        /// Location of the new record.
        rid: Rid,
    },
    /// The record at `rid` was deleted; `record` is the before-image
    /// that undo re-inserts.
    Delete {
        /// Table the record was deleted from.
        table: String,
        /// Location the record occupied.
        rid: Rid,
        /// Full before-image of the deleted record.
        record: Record,
    },
    /// The record at `rid` was overwritten; `record` is the
    /// before-image that undo restores.
    Update {
        /// Table the record lives in.
        table: String,
        /// Location of the record.
        rid: Rid,
        /// Full before-image prior to the update.
        record: Record,
    },
}

/// A transaction: identity, 2PL state, held locks, and undo log.
///
/// Transactions are shared between the session thread, the lock
/// manager, and the executors, so all mutable pieces sit behind
/// `parking_lot` mutexes and every method takes `&self`.
pub struct Transaction {
    id: TxnId,
    state: Mutex<TxnState>,
    lock_set: Mutex<HashSet<LockDataId>>,
    write_set: Mutex<Vec<WriteRecord>>,
}

impl Transaction {
    /// Creates a transaction in the `Growing` state.
    pub fn new(id: TxnId) -> Self {
        Self {
            id,
            state: Mutex::new(TxnState::Growing),
            lock_set: Mutex::new(HashSet::new()),
            write_set: Mutex::new(Vec::new()),
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the current 2PL state.
    pub fn state(&self) -> TxnState {
        *self.state.lock()
    }

    /// Sets the 2PL state.
    pub fn set_state(&self, state: TxnState) {
        *self.state.lock() = state;
    }

    /// Returns true if the transaction's lock set contains `target`.
    pub fn holds(&self, target: &LockDataId) -> bool {
        self.lock_set.lock().contains(target)
    }

    /// Returns a snapshot of every held lock.
    pub fn held_locks(&self) -> Vec<LockDataId> {
        self.lock_set.lock().iter().copied().collect()
    }

    pub(crate) fn add_lock(&self, target: LockDataId) {
        self.lock_set.lock().insert(target);
    }

    pub(crate) fn remove_lock(&self, target: &LockDataId) {
        self.lock_set.lock().remove(target);
    }

    /// Appends an undo log entry.
    pub fn append_write(&self, record: WriteRecord) {
        self.write_set.lock().push(record);
    }

    /// Returns the number of undo log entries.
    pub fn write_count(&self) -> usize {
        self.write_set.lock().len()
    }

    /// Drains the undo log, oldest entry first.
    pub fn take_writes(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut *self.write_set.lock())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
