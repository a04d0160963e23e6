//! Volcano-style query execution.
//!
//! A physical plan is a tree of [`ExecutorNode`]s pulled by the
//! session layer: `open()`, then `next_tuple()`/`current()` until
//! `end()`. Scan nodes walk heap files or index ranges and apply
//! residual predicates; pipeline nodes (projection, nested-loop join)
//! compose children without materializing intermediate results.
//!
//! Mutations do not join the iterator protocol: [`execute_insert`],
//! [`execute_delete`], and [`execute_update`] each drive all their
//! rows in one call, maintain every secondary index, and append undo
//! records to the owning transaction.
//!
//! Row and table locks are taken by the storage handles as operators
//! read and write through them; lock refusals surface here unchanged
//! and the driver aborts the transaction.

pub mod dml;
pub mod error;
pub mod node;
pub mod predicate;

pub use dml::{
    execute_delete, execute_insert, execute_update, DeleteResult, InsertResult, UpdateResult,
};
pub use error::ExecutorError;
pub use node::{ExecutorNode, IndexScan, NestedLoopJoin, Projection, SeqScan};
pub use predicate::{CompOp, CondRhs, Condition, SetClause, TableColumn};
