//! Hierarchical no-wait lock manager.
//!
//! The lock table maps each lockable object (a table or a single
//! record) to a queue of granted requests. Records take only S and X;
//! tables take the full IS/IX/S/SIX/X hierarchy. Every public method
//! holds one global latch for its whole duration and never blocks on a
//! condition variable: a conflict with another transaction's granted
//! request fails immediately with
//! [`DeadlockPrevention`](super::LockError::DeadlockPrevention) and the
//! caller is expected to abort.
//!
//! Mode ordering is defined by the explicit lattice
//! `NONE < IS < {IX, S} < SIX < X` (IX and S are incomparable and join
//! to SIX). It is encoded in [`LockMode::join`]; enum declaration
//! order is never compared.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use parking_lot::Mutex;

use crate::heap::Rid;

use super::error::LockError;
use super::types::{Transaction, TxnId, TxnState};

/// Lock mode on a lockable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Intention shared (table level only).
    IntentionShared,
    /// Intention exclusive (table level only).
    IntentionExclusive,
    /// Shared.
    Shared,
    /// Shared with intention exclusive (table level only, reached by
    /// upgrade).
    SharedIntentionExclusive,
    /// Exclusive.
    Exclusive,
}

impl LockMode {
    /// Returns true if two granted requests from different
    /// transactions may coexist.
    pub fn compatible_with(self, other: LockMode) -> bool {
        use LockMode::*;
        matches!(
            (self, other),
            (IntentionShared, IntentionShared)
                | (IntentionShared, IntentionExclusive)
                | (IntentionShared, Shared)
                | (IntentionShared, SharedIntentionExclusive)
                | (IntentionExclusive, IntentionShared)
                | (IntentionExclusive, IntentionExclusive)
                | (Shared, IntentionShared)
                | (Shared, Shared)
                | (SharedIntentionExclusive, IntentionShared)
        )
    }

    /// Least upper bound of two modes under the hierarchy lattice.
    pub fn join(self, other: LockMode) -> LockMode {
        use LockMode::*;
        match (self, other) {
            (Exclusive, _) | (_, Exclusive) => Exclusive,
            (SharedIntentionExclusive, _) | (_, SharedIntentionExclusive) => {
                SharedIntentionExclusive
            }
            // S and IX are incomparable; their join is SIX.
            (Shared, IntentionExclusive) | (IntentionExclusive, Shared) => {
                SharedIntentionExclusive
            }
            (Shared, _) | (_, Shared) => Shared,
            (IntentionExclusive, _) | (_, IntentionExclusive) => IntentionExclusive,
            (IntentionShared, IntentionShared) => IntentionShared,
        }
    }

    /// Returns true if holding `self` already satisfies a request for
    /// `requested`.
    pub fn covers(self, requested: LockMode) -> bool {
        self.join(requested) == self
    }

    /// Short display name (IS, IX, S, SIX, X).
    pub const fn short_name(self) -> &'static str {
        match self {
            LockMode::IntentionShared => "IS",
            LockMode::IntentionExclusive => "IX",
            LockMode::Shared => "S",
            LockMode::SharedIntentionExclusive => "SIX",
            LockMode::Exclusive => "X",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Aggregate mode of all granted requests on one lockable object.
///
/// This is a cached join over the queue, re-derived from scratch after
/// every mutation; the queue is bounded by the number of concurrent
/// transactions, so the fold is cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupMode {
    /// No granted requests.
    #[default]
    None,
    /// Join of the granted modes.
    Held(LockMode),
}

impl GroupMode {
    /// Folds one more granted mode into the aggregate.
    pub fn join(self, mode: LockMode) -> GroupMode {
        match self {
            GroupMode::None => GroupMode::Held(mode),
            GroupMode::Held(held) => GroupMode::Held(held.join(mode)),
        }
    }
}

impl fmt::Display for GroupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupMode::None => f.write_str("NONE"),
            GroupMode::Held(mode) => mode.fmt(f),
        }
    }
}

/// Identity of one lockable object.
///
/// Record locks and the lock on their containing table are distinct
/// keys, so the two granularities never collide in the lock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockDataId {
    /// A whole table, keyed by the table's file descriptor.
    Table {
        /// Table file descriptor.
        fd: u32,
    },
    /// A single record.
    Record {
        /// Table file descriptor.
        fd: u32,
        /// The record's rid.
        rid: Rid,
    },
}

impl fmt::Display for LockDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDataId::Table { fd } => write!(f, "table {}", fd),
            LockDataId::Record { fd, rid } => write!(f, "record {} of table {}", rid, fd),
        }
    }
}

/// One granted (or, in a waiting design, pending) lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    /// Owning transaction.
    pub txn_id: TxnId,
    /// Requested mode; upgrades rewrite this in place.
    pub mode: LockMode,
    /// Whether the request is granted. Always true under no-wait,
    /// kept so the group-mode fold matches a waiting design.
    pub granted: bool,
}

/// Per-object request queue with its cached aggregate mode.
#[derive(Debug, Default)]
struct LockRequestQueue {
    requests: Vec<LockRequest>,
    group_mode: GroupMode,
}

impl LockRequestQueue {
    /// Re-derives `group_mode` as the join of all granted requests.
    fn recompute_group_mode(&mut self) {
        self.group_mode = self
            .requests
            .iter()
            .filter(|r| r.granted)
            .fold(GroupMode::None, |acc, r| acc.join(r.mode));
    }
}

/// The global lock table.
///
/// Entries are created lazily on first reference and persist for the
/// life of the process; the table is bounded by the distinct objects
/// ever locked.
pub struct LockManager {
    lock_table: Mutex<HashMap<LockDataId, LockRequestQueue>>,
}

impl LockManager {
    /// Creates an empty lock manager.
    pub fn new() -> Self {
        Self {
            lock_table: Mutex::new(HashMap::new()),
        }
    }

    /// Takes a shared lock on one record.
    pub fn lock_shared_on_record(
        &self,
        txn: &Transaction,
        rid: Rid,
        fd: u32,
    ) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Record { fd, rid }, LockMode::Shared)
    }

    /// Takes an exclusive lock on one record, upgrading a held shared
    /// lock in place.
    pub fn lock_exclusive_on_record(
        &self,
        txn: &Transaction,
        rid: Rid,
        fd: u32,
    ) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Record { fd, rid }, LockMode::Exclusive)
    }

    /// Takes an intention-shared lock on a table.
    pub fn lock_is_on_table(&self, txn: &Transaction, fd: u32) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Table { fd }, LockMode::IntentionShared)
    }

    /// Takes an intention-exclusive lock on a table; a held S upgrades
    /// to SIX.
    pub fn lock_ix_on_table(&self, txn: &Transaction, fd: u32) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Table { fd }, LockMode::IntentionExclusive)
    }

    /// Takes a shared lock on a whole table; a held IX upgrades to SIX.
    pub fn lock_shared_on_table(&self, txn: &Transaction, fd: u32) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Table { fd }, LockMode::Shared)
    }

    /// Takes an exclusive lock on a whole table.
    pub fn lock_exclusive_on_table(&self, txn: &Transaction, fd: u32) -> Result<(), LockError> {
        self.acquire(txn, LockDataId::Table { fd }, LockMode::Exclusive)
    }

    /// Releases the transaction's lock on `target`.
    ///
    /// The transaction enters `Shrinking` before the ownership check,
    /// so even a failed unlock ends its growing phase. All of the
    /// transaction's requests on the object are removed and the
    /// aggregate mode is re-derived from the survivors.
    pub fn unlock(&self, txn: &Transaction, target: LockDataId) -> Result<(), LockError> {
        let mut table = self.lock_table.lock();

        match txn.state() {
            TxnState::Aborted | TxnState::Committed => {
                return Err(LockError::InvalidState(txn.id()))
            }
            _ => txn.set_state(TxnState::Shrinking),
        }

        if !txn.holds(&target) {
            return Err(LockError::NotHeld {
                txn: txn.id(),
                target,
            });
        }

        if let Some(queue) = table.get_mut(&target) {
            queue.requests.retain(|r| r.txn_id != txn.id());
            queue.recompute_group_mode();
        }
        txn.remove_lock(&target);
        Ok(())
    }

    /// Shared acquisition path for every lock mode and granularity.
    fn acquire(
        &self,
        txn: &Transaction,
        target: LockDataId,
        mode: LockMode,
    ) -> Result<(), LockError> {
        let mut table = self.lock_table.lock();

        // 2PL gate: shrinking transactions may not grow again, and
        // finished transactions may not lock at all.
        match txn.state() {
            TxnState::Shrinking => return Err(LockError::LockOnShrinking(txn.id())),
            TxnState::Aborted | TxnState::Committed => {
                return Err(LockError::InvalidState(txn.id()))
            }
            _ => txn.set_state(TxnState::Growing),
        }

        let queue = table.entry(target).or_default();

        // No-wait conflict scan: any incompatible granted request from
        // another transaction refuses this one immediately. The same
        // pass finds our own request for the upgrade path.
        let mut own: Option<usize> = None;
        for (i, req) in queue.requests.iter().enumerate() {
            if req.txn_id == txn.id() {
                own = Some(i);
            } else if req.granted && !mode.compatible_with(req.mode) {
                debug!(
                    "txn {} refused {} on {}: conflicts with txn {} holding {}",
                    txn.id(),
                    mode,
                    target,
                    req.txn_id,
                    req.mode
                );
                return Err(LockError::DeadlockPrevention(txn.id()));
            }
        }

        match own {
            Some(i) => {
                // Upgrade in place to the join of held and requested
                // (S+X -> X, IS+S -> S, IS+IX -> IX, S+IX -> SIX). A
                // covering hold leaves the request untouched.
                let held = queue.requests[i].mode;
                if !held.covers(mode) {
                    queue.requests[i].mode = held.join(mode);
                }
            }
            None => {
                queue.requests.push(LockRequest {
                    txn_id: txn.id(),
                    mode,
                    granted: true,
                });
                txn.add_lock(target);
            }
        }

        // Re-derive the aggregate even when the hold already covered
        // the request, so the cached mode can never under-report.
        queue.recompute_group_mode();
        Ok(())
    }

    /// Returns the aggregate granted mode on `target`.
    pub fn group_mode(&self, target: &LockDataId) -> GroupMode {
        self.lock_table
            .lock()
            .get(target)
            .map(|q| q.group_mode)
            .unwrap_or_default()
    }

    /// Returns a snapshot of the granted requests on `target`.
    pub fn granted_requests(&self, target: &LockDataId) -> Vec<LockRequest> {
        self.lock_table
            .lock()
            .get(target)
            .map(|q| q.requests.iter().filter(|r| r.granted).copied().collect())
            .unwrap_or_default()
    }

    /// Returns true if no object has a granted request.
    pub fn is_clean(&self) -> bool {
        self.lock_table
            .lock()
            .values()
            .all(|q| q.requests.is_empty())
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
