//! Executor error types.

use std::fmt;

use crate::catalog::CatalogError;
use crate::datum::{ColType, DatumError};
use crate::heap::HeapError;
use crate::index::IndexError;

/// Errors that can occur during query execution.
#[derive(Debug)]
pub enum ExecutorError {
    /// Referenced column does not exist in the operator's schema.
    ColumnNotFound {
        /// The unresolved reference, as written.
        name: String,
    },
    /// No index over the requested columns.
    IndexNotFound {
        /// The table.
        table: String,
        /// The requested column list.
        columns: String,
    },
    /// Value count does not match the table's column count.
    ColumnCountMismatch {
        /// Columns in the table.
        expected: usize,
        /// Values supplied.
        found: usize,
    },
    /// Operand types disagree in a predicate, join condition, or SET
    /// clause.
    TypeMismatch {
        /// Type of the left-hand column.
        expected: ColType,
        /// Type actually supplied.
        found: ColType,
    },
    /// Condition shape the operator cannot evaluate.
    Unsupported(String),
    /// Literal encoding failure.
    Datum(DatumError),
    /// Catalog lookup failure.
    Catalog(CatalogError),
    /// Heap access failure (including lock refusals routed through the
    /// file handle).
    Heap(HeapError),
    /// Index access failure.
    Index(IndexError),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::ColumnNotFound { name } => {
                write!(f, "column \"{}\" does not exist", name)
            }
            ExecutorError::IndexNotFound { table, columns } => {
                write!(f, "no index on \"{}\" over ({})", table, columns)
            }
            ExecutorError::ColumnCountMismatch { expected, found } => {
                write!(f, "expected {} values, got {}", expected, found)
            }
            ExecutorError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            ExecutorError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            ExecutorError::Datum(e) => e.fmt(f),
            ExecutorError::Catalog(e) => e.fmt(f),
            ExecutorError::Heap(e) => e.fmt(f),
            ExecutorError::Index(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<DatumError> for ExecutorError {
    fn from(e: DatumError) -> Self {
        ExecutorError::Datum(e)
    }
}

impl From<CatalogError> for ExecutorError {
    fn from(e: CatalogError) -> Self {
        ExecutorError::Catalog(e)
    }
}

impl From<HeapError> for ExecutorError {
    fn from(e: HeapError) -> Self {
        ExecutorError::Heap(e)
    }
}

impl From<IndexError> for ExecutorError {
    fn from(e: IndexError) -> Self {
        ExecutorError::Index(e)
    }
}
