//! Error types for the heap module.

use std::fmt;

use crate::tx::LockError;

use super::file::Rid;

/// Errors from heap file operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// Page number outside the file.
    PageOutOfRange {
        /// Requested page.
        page_no: u32,
        /// Pages in the file (including the header page).
        num_pages: u32,
    },
    /// No record at the given rid (slot free or out of range).
    RecordNotFound(Rid),
    /// Record buffer length does not match the file's record size.
    RecordSizeMismatch {
        /// The file's fixed record size.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },
    /// Row or table lock acquisition failed while routing through the
    /// operation context.
    Lock(LockError),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::PageOutOfRange { page_no, num_pages } => {
                write!(f, "page {} out of range (file has {})", page_no, num_pages)
            }
            HeapError::RecordNotFound(rid) => write!(f, "no record at {}", rid),
            HeapError::RecordSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "record size mismatch: expected {} bytes, got {}",
                    expected, actual
                )
            }
            HeapError::Lock(e) => write!(f, "lock failure: {}", e),
        }
    }
}

impl std::error::Error for HeapError {}

impl From<LockError> for HeapError {
    fn from(e: LockError) -> Self {
        HeapError::Lock(e)
    }
}
