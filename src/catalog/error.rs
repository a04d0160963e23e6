//! Catalog error types.

use std::fmt;

use crate::heap::HeapError;
use crate::index::IndexError;

/// Errors from catalog lookups and registration.
#[derive(Debug)]
pub enum CatalogError {
    /// Referenced table is not registered.
    TableNotFound(String),
    /// Table registered twice.
    TableExists(String),
    /// Referenced index is not registered.
    IndexNotFound(String),
    /// Index registered twice.
    IndexExists(String),
    /// Index declared over a column the table does not have.
    UnknownColumn {
        /// The table.
        table: String,
        /// The missing column.
        column: String,
    },
    /// Registered file's record size disagrees with the table schema.
    RecordSizeMismatch {
        /// The table.
        table: String,
        /// Record size per the schema.
        schema: usize,
        /// Record size per the file header.
        file: usize,
    },
    /// Heap scan failure while backfilling a new index.
    Heap(HeapError),
    /// Index insert failure while backfilling a new index.
    Index(IndexError),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::TableNotFound(name) => write!(f, "table \"{}\" does not exist", name),
            CatalogError::TableExists(name) => write!(f, "table \"{}\" already exists", name),
            CatalogError::IndexNotFound(name) => write!(f, "index \"{}\" does not exist", name),
            CatalogError::IndexExists(name) => write!(f, "index \"{}\" already exists", name),
            CatalogError::UnknownColumn { table, column } => {
                write!(f, "table \"{}\" has no column \"{}\"", table, column)
            }
            CatalogError::RecordSizeMismatch {
                table,
                schema,
                file,
            } => write!(
                f,
                "table \"{}\": schema says {} byte records, file says {}",
                table, schema, file
            ),
            CatalogError::Heap(e) => write!(f, "heap failure during index backfill: {}", e),
            CatalogError::Index(e) => write!(f, "index failure during backfill: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<HeapError> for CatalogError {
    fn from(e: HeapError) -> Self {
        CatalogError::Heap(e)
    }
}

impl From<IndexError> for CatalogError {
    fn from(e: IndexError) -> Self {
        CatalogError::Index(e)
    }
}
