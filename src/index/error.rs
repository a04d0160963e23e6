//! Index error types.

use std::fmt;

/// Errors from index operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Insert of a key that is already present.
    DuplicateKey(Vec<u8>),
    /// Delete of a key that is not present.
    KeyNotFound(Vec<u8>),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::DuplicateKey(key) => {
                write!(f, "duplicate index key {}", HexKey(key))
            }
            IndexError::KeyNotFound(key) => {
                write!(f, "index key {} not found", HexKey(key))
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Formats raw key bytes as hex for error messages.
struct HexKey<'a>(&'a [u8]);

impl fmt::Display for HexKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
