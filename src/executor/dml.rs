//! Mutation executors (INSERT, DELETE, UPDATE).
//!
//! Unlike the iterator nodes, each mutation drives all of its rows in
//! a single call. Every operation keeps all secondary indexes
//! consistent with the heap and appends an undo record to the owning
//! transaction before returning, so the transaction manager can roll
//! the whole statement back.
//!
//! DELETE and UPDATE consume a set of rids precomputed by an upstream
//! scan; rows are processed in the order supplied.

use crate::catalog::SystemCatalog;
use crate::datum::Value;
use crate::heap::{Record, Rid, TableFile};
use crate::index::IndexFile;
use crate::tx::{Context, WriteRecord};

use super::error::ExecutorError;
use super::predicate::{evaluate, find_column, Condition, SetClause};

/// Result of an INSERT operation.
#[derive(Debug)]
pub struct InsertResult {
    /// Location of the new record.
    pub rid: Rid,
}

/// Result of a DELETE operation.
#[derive(Debug)]
pub struct DeleteResult {
    /// Number of rows deleted.
    pub row_count: u64,
}

/// Result of an UPDATE operation.
#[derive(Debug)]
pub struct UpdateResult {
    /// Number of rows updated.
    pub row_count: u64,
}

/// Inserts one row given as column values in declaration order.
///
/// The record bytes are laid out per the table schema, the record is
/// inserted, every index receives the new key, and an
/// [`WriteRecord::Insert`] undo entry is appended.
pub fn execute_insert<F: TableFile, I: IndexFile>(
    catalog: &SystemCatalog<F, I>,
    table: &str,
    values: &[Value],
    ctx: &Context<'_>,
) -> Result<InsertResult, ExecutorError> {
    let meta = catalog.table(table)?;
    if values.len() != meta.cols.len() {
        return Err(ExecutorError::ColumnCountMismatch {
            expected: meta.cols.len(),
            found: values.len(),
        });
    }

    let mut record = Record::zeroed(meta.record_size());
    for (col, value) in meta.cols.iter().zip(values) {
        if value.col_type() != col.ty {
            return Err(ExecutorError::TypeMismatch {
                expected: col.ty,
                found: value.col_type(),
            });
        }
        record.write(col.offset, &value.encode(col.len)?);
    }

    let file = catalog.file(table)?;
    let rid = file.insert_record(record.as_slice(), ctx)?;
    for index_meta in &meta.indexes {
        let index = catalog.index(&index_meta.name)?;
        index.insert_entry(&index_meta.key_of(&record), rid, ctx.txn)?;
    }

    ctx.txn.append_write(WriteRecord::Insert {
        table: table.to_string(),
        rid,
    });
    Ok(InsertResult { rid })
}

/// Deletes the records at `rids`, in the order supplied.
///
/// For each rid the before-image is fetched first; every index key is
/// built from that image and removed, then the record itself is
/// deleted and a [`WriteRecord::Delete`] undo entry carrying the image
/// is appended.
pub fn execute_delete<F: TableFile, I: IndexFile>(
    catalog: &SystemCatalog<F, I>,
    table: &str,
    rids: &[Rid],
    ctx: &Context<'_>,
) -> Result<DeleteResult, ExecutorError> {
    let meta = catalog.table(table)?;
    let file = catalog.file(table)?;

    for &rid in rids {
        let before = file.get_record(rid, ctx)?;
        for index_meta in &meta.indexes {
            let index = catalog.index(&index_meta.name)?;
            index.delete_entry(&index_meta.key_of(&before), ctx.txn)?;
        }
        file.delete_record(rid, ctx)?;
        ctx.txn.append_write(WriteRecord::Delete {
            table: table.to_string(),
            rid,
            record: before,
        });
    }
    Ok(DeleteResult {
        row_count: rids.len() as u64,
    })
}

/// Applies `set_clauses` to the records at `rids`, in the order
/// supplied.
///
/// Rows whose current image no longer satisfies `conds` are skipped
/// (the rid set was computed by an earlier scan). Every index is
/// rewritten unconditionally, old key out and new key in, even when
/// the indexed columns did not change; the heap record is then
/// overwritten and a [`WriteRecord::Update`] undo entry carrying the
/// before-image is appended.
pub fn execute_update<F: TableFile, I: IndexFile>(
    catalog: &SystemCatalog<F, I>,
    table: &str,
    set_clauses: &[SetClause],
    rids: &[Rid],
    conds: &[Condition],
    ctx: &Context<'_>,
) -> Result<UpdateResult, ExecutorError> {
    let meta = catalog.table(table)?;
    let file = catalog.file(table)?;

    let mut row_count = 0u64;
    for &rid in rids {
        let before = file.get_record(rid, ctx)?;
        if !evaluate(conds, &before, &meta.cols)? {
            continue;
        }

        let mut after = before.clone();
        for clause in set_clauses {
            let col = find_column(&meta.cols, &clause.column)?;
            if clause.value.col_type() != col.ty {
                return Err(ExecutorError::TypeMismatch {
                    expected: col.ty,
                    found: clause.value.col_type(),
                });
            }
            after.write(col.offset, &clause.value.encode(col.len)?);
        }

        for index_meta in &meta.indexes {
            let index = catalog.index(&index_meta.name)?;
            index.delete_entry(&index_meta.key_of(&before), ctx.txn)?;
            index.insert_entry(&index_meta.key_of(&after), rid, ctx.txn)?;
        }
        file.update_record(rid, after.as_slice(), ctx)?;

        ctx.txn.append_write(WriteRecord::Update {
            table: table.to_string(),
            rid,
            record: before,
        });
        row_count += 1;
    }
    Ok(UpdateResult { row_count })
}
