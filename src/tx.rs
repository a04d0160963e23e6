//! Transactions and multi-granularity two-phase locking.
//!
//! This module implements the concurrency-control core:
//! - Transaction identity, 2PL state, lock set, and undo log
//!   ([`Transaction`], [`WriteRecord`])
//! - The hierarchical no-wait lock manager ([`LockManager`]) with
//!   record S/X and table IS/IX/S/SIX/X modes
//! - Transaction lifecycle with write-set rollback
//!   ([`TransactionManager`])
//!
//! Deadlocks are prevented rather than detected: any conflict with
//! another transaction's granted request fails the caller immediately,
//! and the driver aborts that transaction.

pub mod context;
pub mod error;
pub mod lock;
pub mod manager;
pub mod types;

pub use context::Context;
pub use error::{LockError, TxError};
pub use lock::{GroupMode, LockDataId, LockManager, LockMode, LockRequest};
pub use manager::TransactionManager;
pub use types::{Transaction, TxnId, TxnState, WriteRecord};
