//! Column types, literal values, and the fixed-width byte comparator.
//!
//! This module defines the canonical type system for table columns.
//! Every column occupies a fixed number of bytes inside a record:
//! [`ColType::Int`] is a 4-byte little-endian `i32`, [`ColType::Float`]
//! an 8-byte little-endian `f64`, and [`ColType::Str`] a fixed-width
//! zero-padded byte string. [`compare`] is the single comparator shared
//! by predicate evaluation, scans, and joins.

use std::cmp::Ordering;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Errors from encoding literal values into column bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatumError {
    /// String literal longer than the column it is compared against or
    /// stored into.
    StringTooLong {
        /// Bytes in the literal.
        len: usize,
        /// Fixed width of the column.
        max: usize,
    },
    /// Fixed-width encoding requested with the wrong length for the type.
    WidthMismatch {
        /// The type being encoded.
        ty: ColType,
        /// Requested width.
        requested: usize,
    },
}

impl fmt::Display for DatumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatumError::StringTooLong { len, max } => {
                write!(f, "string of {} bytes exceeds column width {}", len, max)
            }
            DatumError::WidthMismatch { ty, requested } => {
                write!(f, "{} cannot be encoded into {} bytes", ty, requested)
            }
        }
    }
}

impl std::error::Error for DatumError {}

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColType {
    /// 4-byte signed integer, little-endian.
    Int,
    /// 8-byte IEEE 754 double, little-endian.
    Float,
    /// Fixed-width byte string, zero-padded to the column width.
    Str,
}

impl ColType {
    /// Returns the fixed byte size for numeric types, or `None` for
    /// strings (whose width is declared per column).
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            ColType::Int => Some(4),
            ColType::Float => Some(8),
            ColType::Str => None,
        }
    }

    /// Returns the SQL-ish display name for this type.
    pub const fn display_name(self) -> &'static str {
        match self {
            ColType::Int => "INT",
            ColType::Float => "FLOAT",
            ColType::Str => "STRING",
        }
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A typed literal value, as it appears on the right-hand side of a
/// condition or in a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Integer literal.
    Int(i32),
    /// Floating-point literal.
    Float(f64),
    /// String literal.
    Str(String),
}

impl Value {
    /// Returns the column type this literal carries.
    pub fn col_type(&self) -> ColType {
        match self {
            Value::Int(_) => ColType::Int,
            Value::Float(_) => ColType::Float,
            Value::Str(_) => ColType::Str,
        }
    }

    /// Encodes this value into exactly `len` bytes of column storage.
    ///
    /// Numeric types require their fixed width. Strings shorter than
    /// `len` are zero-padded on the right; longer strings are an error.
    pub fn encode(&self, len: usize) -> Result<Bytes, DatumError> {
        match self {
            Value::Int(v) => {
                if len != 4 {
                    return Err(DatumError::WidthMismatch {
                        ty: ColType::Int,
                        requested: len,
                    });
                }
                Ok(Bytes::copy_from_slice(&v.to_le_bytes()))
            }
            Value::Float(v) => {
                if len != 8 {
                    return Err(DatumError::WidthMismatch {
                        ty: ColType::Float,
                        requested: len,
                    });
                }
                Ok(Bytes::copy_from_slice(&v.to_le_bytes()))
            }
            Value::Str(s) => {
                if s.len() > len {
                    return Err(DatumError::StringTooLong {
                        len: s.len(),
                        max: len,
                    });
                }
                let mut buf = BytesMut::with_capacity(len);
                buf.put_slice(s.as_bytes());
                buf.put_bytes(0, len - s.len());
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Compares two column-encoded operands of type `ty` and width `len`.
///
/// Strings compare byte-wise over the full fixed width (trailing zero
/// padding included, so equal strings of equal declared width compare
/// equal). Numerics are decoded and compared by value; floats use
/// `total_cmp`, which is a total order and never panics on NaN.
///
/// Both slices must hold at least the operand width; callers slice
/// records by column metadata, which guarantees this.
pub fn compare(l: &[u8], r: &[u8], ty: ColType, len: usize) -> Ordering {
    match ty {
        ColType::Int => {
            let lv = i32::from_le_bytes(l[..4].try_into().expect("int operand width"));
            let rv = i32::from_le_bytes(r[..4].try_into().expect("int operand width"));
            lv.cmp(&rv)
        }
        ColType::Float => {
            let lv = f64::from_le_bytes(l[..8].try_into().expect("float operand width"));
            let rv = f64::from_le_bytes(r[..8].try_into().expect("float operand width"));
            lv.total_cmp(&rv)
        }
        ColType::Str => l[..len].cmp(&r[..len]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_int() {
        let bytes = Value::Int(1).encode(4).unwrap();
        assert_eq!(&bytes[..], &[0x01, 0x00, 0x00, 0x00]);

        let bytes = Value::Int(-1).encode(4).unwrap();
        assert_eq!(&bytes[..], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_encode_int_wrong_width() {
        let result = Value::Int(1).encode(8);
        assert!(matches!(result, Err(DatumError::WidthMismatch { .. })));
    }

    #[test]
    fn test_encode_str_pads_to_width() {
        let bytes = Value::Str("a".to_string()).encode(8).unwrap();
        assert_eq!(&bytes[..], b"a\0\0\0\0\0\0\0");
    }

    #[test]
    fn test_encode_str_too_long() {
        let result = Value::Str("abcdef".to_string()).encode(4);
        assert!(matches!(
            result,
            Err(DatumError::StringTooLong { len: 6, max: 4 })
        ));
    }

    #[test]
    fn test_compare_int() {
        let a = Value::Int(3).encode(4).unwrap();
        let b = Value::Int(10).encode(4).unwrap();
        assert_eq!(compare(&a, &b, ColType::Int, 4), Ordering::Less);
        assert_eq!(compare(&b, &a, ColType::Int, 4), Ordering::Greater);
        assert_eq!(compare(&a, &a, ColType::Int, 4), Ordering::Equal);

        // Byte-wise comparison would get this wrong: -1 encodes with
        // all bits set but is numerically smaller than 1.
        let neg = Value::Int(-1).encode(4).unwrap();
        let one = Value::Int(1).encode(4).unwrap();
        assert_eq!(compare(&neg, &one, ColType::Int, 4), Ordering::Less);
    }

    #[test]
    fn test_compare_float() {
        let a = Value::Float(1.5).encode(8).unwrap();
        let b = Value::Float(2.25).encode(8).unwrap();
        assert_eq!(compare(&a, &b, ColType::Float, 8), Ordering::Less);
        assert_eq!(compare(&a, &a, ColType::Float, 8), Ordering::Equal);
    }

    #[test]
    fn test_compare_str_fixed_width() {
        let a = Value::Str("abc".to_string()).encode(8).unwrap();
        let b = Value::Str("abd".to_string()).encode(8).unwrap();
        assert_eq!(compare(&a, &b, ColType::Str, 8), Ordering::Less);
        assert_eq!(compare(&a, &a, ColType::Str, 8), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Str("x".to_string()).to_string(), "'x'");
        assert_eq!(ColType::Str.to_string(), "STRING");
    }
}
