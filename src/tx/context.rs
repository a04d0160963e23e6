//! Operation context threaded through file and index handles.

use super::lock::LockManager;
use super::types::Transaction;

/// Per-operation context: the owning transaction plus the lock manager
/// used by storage handles to route row and table locks.
///
/// The recovery path (write-set rollback) runs without a lock manager:
/// an aborting transaction still holds its exclusive locks, and 2PL
/// forbids acquiring anything new once it has started releasing.
pub struct Context<'a> {
    /// The transaction driving the operation.
    pub txn: &'a Transaction,
    /// Lock manager for storage handles, or `None` on the recovery
    /// path.
    pub locks: Option<&'a LockManager>,
}

impl<'a> Context<'a> {
    /// Creates a context that routes locks through `locks`.
    pub fn new(txn: &'a Transaction, locks: &'a LockManager) -> Self {
        Self {
            txn,
            locks: Some(locks),
        }
    }

    /// Creates a lock-free context for rollback and bootstrap work.
    pub fn recovery(txn: &'a Transaction) -> Self {
        Self { txn, locks: None }
    }
}
