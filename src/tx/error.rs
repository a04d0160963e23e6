//! Transaction and locking error types.

use std::fmt;

use crate::catalog::CatalogError;
use crate::heap::HeapError;
use crate::index::IndexError;

use super::lock::LockDataId;
use super::types::TxnId;

/// Failures surfaced by the lock manager.
///
/// `LockOnShrinking` and `DeadlockPrevention` require the caller to
/// abort the transaction; `InvalidState` and `NotHeld` report calls
/// that were invalid to begin with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// Acquisition attempted after the transaction started releasing
    /// locks (two-phase locking violation).
    LockOnShrinking(TxnId),
    /// The request conflicts with another transaction's granted lock;
    /// under no-wait prevention the requester must abort.
    DeadlockPrevention(TxnId),
    /// Lock or unlock on an already committed or aborted transaction.
    InvalidState(TxnId),
    /// Unlock of a lock the transaction does not hold.
    NotHeld {
        /// The requesting transaction.
        txn: TxnId,
        /// The lock it does not own.
        target: LockDataId,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::LockOnShrinking(txn) => {
                write!(f, "transaction {} acquired a lock while shrinking", txn)
            }
            LockError::DeadlockPrevention(txn) => {
                write!(f, "transaction {} refused a conflicting lock (no-wait)", txn)
            }
            LockError::InvalidState(txn) => {
                write!(f, "transaction {} is already finished", txn)
            }
            LockError::NotHeld { txn, target } => {
                write!(f, "transaction {} does not hold {}", txn, target)
            }
        }
    }
}

impl std::error::Error for LockError {}

/// Errors from the transaction manager.
///
/// Rollback reaches through the catalog into heap files and indexes,
/// so their errors surface here unchanged.
#[derive(Debug)]
pub enum TxError {
    /// Commit or abort on a transaction that already finished.
    TransactionFinished(TxnId),
    /// Lock release failure.
    Lock(LockError),
    /// Heap access failure during rollback.
    Heap(HeapError),
    /// Index maintenance failure during rollback.
    Index(IndexError),
    /// Catalog lookup failure during rollback.
    Catalog(CatalogError),
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::TransactionFinished(txn) => {
                write!(f, "transaction {} already finished", txn)
            }
            TxError::Lock(e) => write!(f, "lock failure: {}", e),
            TxError::Heap(e) => write!(f, "heap failure during rollback: {}", e),
            TxError::Index(e) => write!(f, "index failure during rollback: {}", e),
            TxError::Catalog(e) => write!(f, "catalog failure during rollback: {}", e),
        }
    }
}

impl std::error::Error for TxError {}

impl From<LockError> for TxError {
    fn from(e: LockError) -> Self {
        TxError::Lock(e)
    }
}

impl From<HeapError> for TxError {
    fn from(e: HeapError) -> Self {
        TxError::Heap(e)
    }
}

impl From<IndexError> for TxError {
    fn from(e: IndexError) -> Self {
        TxError::Index(e)
    }
}

impl From<CatalogError> for TxError {
    fn from(e: CatalogError) -> Self {
        TxError::Catalog(e)
    }
}
