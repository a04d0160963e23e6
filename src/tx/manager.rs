//! Transaction lifecycle: begin, commit, and abort with rollback.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::catalog::SystemCatalog;
use crate::heap::TableFile;
use crate::index::IndexFile;

use super::context::Context;
use super::error::TxError;
use super::lock::LockManager;
use super::types::{Transaction, TxnId, TxnState, WriteRecord};

/// State behind one mutex so ID allocation and live-transaction
/// tracking stay atomic.
struct ManagerState {
    next_txn_id: u64,
    active: HashMap<TxnId, Arc<Transaction>>,
}

/// Allocates transactions and finishes them.
///
/// Commit discards the undo log and releases every lock. Abort walks
/// the undo log in reverse, restoring heap records and index entries,
/// then releases locks. Either way the transaction's 2PL state runs
/// `Growing -> Shrinking -> (Committed | Aborted)`; the shrinking step
/// happens inside the lock manager on the first release.
pub struct TransactionManager<F: TableFile, I: IndexFile> {
    catalog: Arc<SystemCatalog<F, I>>,
    locks: Arc<LockManager>,
    state: Mutex<ManagerState>,
}

impl<F: TableFile, I: IndexFile> TransactionManager<F, I> {
    /// Creates a manager over `catalog`, routing locks to `locks`.
    pub fn new(catalog: Arc<SystemCatalog<F, I>>, locks: Arc<LockManager>) -> Self {
        Self {
            catalog,
            locks,
            state: Mutex::new(ManagerState {
                next_txn_id: 1,
                active: HashMap::new(),
            }),
        }
    }

    /// Returns the lock manager transactions of this manager use.
    pub fn lock_manager(&self) -> &LockManager {
        &self.locks
    }

    /// Starts a new transaction.
    pub fn begin(&self) -> Arc<Transaction> {
        let mut state = self.state.lock();
        let id = TxnId::new(state.next_txn_id);
        state.next_txn_id += 1;
        let txn = Arc::new(Transaction::new(id));
        state.active.insert(id, txn.clone());
        debug!("txn {} begins", id);
        txn
    }

    /// Looks up a live transaction by ID.
    pub fn transaction(&self, id: TxnId) -> Option<Arc<Transaction>> {
        self.state.lock().active.get(&id).cloned()
    }

    /// Commits `txn`: the undo log is discarded, every lock released.
    pub fn commit(&self, txn: &Transaction) -> Result<(), TxError> {
        self.check_unfinished(txn)?;
        txn.take_writes();
        self.release_locks(txn)?;
        txn.set_state(TxnState::Committed);
        self.state.lock().active.remove(&txn.id());
        debug!("txn {} committed", txn.id());
        Ok(())
    }

    /// Aborts `txn`: the undo log is applied newest-first, then every
    /// lock is released.
    ///
    /// Rollback runs under a lock-free recovery context. The aborting
    /// transaction still holds exclusive locks on everything it wrote,
    /// and 2PL forbids acquiring more once shrinking starts.
    pub fn abort(&self, txn: &Transaction) -> Result<(), TxError> {
        self.check_unfinished(txn)?;
        let writes = txn.take_writes();
        let ctx = Context::recovery(txn);
        for write in writes.into_iter().rev() {
            self.undo(&ctx, write)?;
        }
        self.release_locks(txn)?;
        txn.set_state(TxnState::Aborted);
        self.state.lock().active.remove(&txn.id());
        debug!("txn {} aborted", txn.id());
        Ok(())
    }

    fn check_unfinished(&self, txn: &Transaction) -> Result<(), TxError> {
        match txn.state() {
            TxnState::Committed | TxnState::Aborted => {
                Err(TxError::TransactionFinished(txn.id()))
            }
            _ => Ok(()),
        }
    }

    fn release_locks(&self, txn: &Transaction) -> Result<(), TxError> {
        for target in txn.held_locks() {
            self.locks.unlock(txn, target)?;
        }
        Ok(())
    }

    /// Reverses one undo log entry, keeping every secondary index
    /// consistent with the restored heap state.
    fn undo(&self, ctx: &Context<'_>, write: WriteRecord) -> Result<(), TxError> {
        match write {
            WriteRecord::Insert { table, rid } => {
                let meta = self.catalog.table(&table)?;
                let file = self.catalog.file(&table)?;
                let record = file.get_record(rid, ctx)?;
                for index_meta in &meta.indexes {
                    self.catalog
                        .index(&index_meta.name)?
                        .delete_entry(&index_meta.key_of(&record), ctx.txn)?;
                }
                file.delete_record(rid, ctx)?;
            }
            WriteRecord::Delete { table, record, .. } => {
                let meta = self.catalog.table(&table)?;
                let file = self.catalog.file(&table)?;
                // The slot may have been reused; the restored record
                // gets whatever rid the file hands out.
                let rid = file.insert_record(record.as_slice(), ctx)?;
                for index_meta in &meta.indexes {
                    self.catalog.index(&index_meta.name)?.insert_entry(
                        &index_meta.key_of(&record),
                        rid,
                        ctx.txn,
                    )?;
                }
            }
            WriteRecord::Update { table, rid, record } => {
                let meta = self.catalog.table(&table)?;
                let file = self.catalog.file(&table)?;
                let current = file.get_record(rid, ctx)?;
                for index_meta in &meta.indexes {
                    let index = self.catalog.index(&index_meta.name)?;
                    index.delete_entry(&index_meta.key_of(&current), ctx.txn)?;
                    index.insert_entry(&index_meta.key_of(&record), rid, ctx.txn)?;
                }
                file.update_record(rid, record.as_slice(), ctx)?;
            }
        }
        Ok(())
    }
}
