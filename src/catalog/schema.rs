//! Table, column, and index metadata.

use bytes::{BufMut, Bytes, BytesMut};

use crate::datum::ColType;
use crate::heap::Record;

/// Metadata of one column.
///
/// Within a table, column offsets partition the fixed-width record
/// payload contiguously; the record size is the end of the last
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Owning table name (used for qualified lookup).
    pub table: String,
    /// Column name.
    pub name: String,
    /// Column type.
    pub ty: ColType,
    /// Byte offset within the record.
    pub offset: usize,
    /// Byte width within the record.
    pub len: usize,
}

/// Metadata of one secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Catalog name of the index (see
    /// [`index_name`](super::core::index_name)).
    pub name: String,
    /// Indexed columns in declaration order, with their offsets in the
    /// *table* record layout.
    pub cols: Vec<ColumnMeta>,
    /// Total key width: the sum of the indexed columns' widths.
    pub total_len: usize,
}

impl IndexMeta {
    /// Returns the number of indexed columns.
    pub fn col_count(&self) -> usize {
        self.cols.len()
    }

    /// Builds the index key for `record`: the indexed columns' bytes
    /// concatenated in declaration order, no separator, no length
    /// prefix.
    pub fn key_of(&self, record: &Record) -> Bytes {
        let mut key = BytesMut::with_capacity(self.total_len);
        for col in &self.cols {
            key.put_slice(record.field(col.offset, col.len));
        }
        key.freeze()
    }
}

/// Metadata of one table: its columns and its secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub cols: Vec<ColumnMeta>,
    /// Secondary indexes on this table.
    pub indexes: Vec<IndexMeta>,
}

impl TableMeta {
    /// Creates a table with no columns yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cols: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Appends a column, assigning the next free offset.
    ///
    /// For numeric types the declared width is overridden by the
    /// type's fixed size; `len` only matters for strings.
    pub fn add_column(mut self, name: impl Into<String>, ty: ColType, len: usize) -> Self {
        let len = ty.fixed_size().unwrap_or(len);
        let offset = self.record_size();
        self.cols.push(ColumnMeta {
            table: self.name.clone(),
            name: name.into(),
            ty,
            offset,
            len,
        });
        self
    }

    /// Returns the fixed record width: end offset of the last column.
    pub fn record_size(&self) -> usize {
        self.cols.last().map(|c| c.offset + c.len).unwrap_or(0)
    }

    /// Looks up a column by name.
    pub fn col(&self, name: &str) -> Option<&ColumnMeta> {
        self.cols.iter().find(|c| c.name == name)
    }

    /// Finds the index whose column names equal `col_names` in order.
    pub fn index_on(&self, col_names: &[&str]) -> Option<&IndexMeta> {
        self.indexes.iter().find(|idx| {
            idx.cols.len() == col_names.len()
                && idx.cols.iter().zip(col_names).all(|(c, n)| c.name == *n)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> TableMeta {
        TableMeta::new("users")
            .add_column("id", ColType::Int, 0)
            .add_column("name", ColType::Str, 8)
            .add_column("score", ColType::Float, 0)
    }

    #[test]
    fn test_offsets_partition_the_record() {
        let meta = sample_table();
        assert_eq!(meta.cols[0].offset, 0);
        assert_eq!(meta.cols[0].len, 4);
        assert_eq!(meta.cols[1].offset, 4);
        assert_eq!(meta.cols[1].len, 8);
        assert_eq!(meta.cols[2].offset, 12);
        assert_eq!(meta.cols[2].len, 8);
        assert_eq!(meta.record_size(), 20);
    }

    #[test]
    fn test_col_lookup() {
        let meta = sample_table();
        assert_eq!(meta.col("name").unwrap().offset, 4);
        assert!(meta.col("missing").is_none());
    }

    #[test]
    fn test_index_key_concatenates_columns() {
        let meta = sample_table();
        let idx = IndexMeta {
            name: "users_name_id".to_string(),
            cols: vec![meta.col("name").unwrap().clone(), meta.col("id").unwrap().clone()],
            total_len: 12,
        };

        let mut rec = Record::zeroed(meta.record_size());
        rec.write(0, &7i32.to_le_bytes());
        rec.write(4, b"ab\0\0\0\0\0\0");

        let key = idx.key_of(&rec);
        assert_eq!(key.len(), 12);
        assert_eq!(&key[..8], b"ab\0\0\0\0\0\0");
        assert_eq!(&key[8..], &7i32.to_le_bytes());
    }
}
