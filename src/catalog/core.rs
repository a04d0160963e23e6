//! The system catalog: schemas, file handles, index handles.

use std::collections::HashMap;

use crate::heap::{MemoryTable, RecordScan, RowCursor, TableFile};
use crate::index::{IndexFile, MemoryIndex};
use crate::tx::{Context, Transaction, TxnId};

use super::error::CatalogError;
use super::schema::{IndexMeta, TableMeta};

/// Returns the catalog name of the index on `table` over `cols`, in
/// declaration order.
pub fn index_name(table: &str, cols: &[&str]) -> String {
    let mut name = String::from(table);
    for col in cols {
        name.push('_');
        name.push_str(col);
    }
    name
}

/// The system catalog, generic over the storage implementations.
///
/// Registration happens single-threaded at engine start (`&mut self`);
/// afterwards the catalog is shared immutably across session threads.
pub struct SystemCatalog<F: TableFile, I: IndexFile> {
    tables: HashMap<String, TableMeta>,
    files: HashMap<String, F>,
    indexes: HashMap<String, I>,
    next_table_id: u32,
}

impl<F: TableFile, I: IndexFile> SystemCatalog<F, I> {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            files: HashMap::new(),
            indexes: HashMap::new(),
            next_table_id: 1,
        }
    }

    /// Registers a table schema together with its heap file.
    pub fn register_table(&mut self, meta: TableMeta, file: F) -> Result<(), CatalogError> {
        if self.tables.contains_key(&meta.name) {
            return Err(CatalogError::TableExists(meta.name));
        }
        let file_size = file.header().record_size;
        let schema_size = meta.record_size();
        if file_size != schema_size {
            return Err(CatalogError::RecordSizeMismatch {
                table: meta.name,
                schema: schema_size,
                file: file_size,
            });
        }
        self.files.insert(meta.name.clone(), file);
        self.tables.insert(meta.name.clone(), meta);
        Ok(())
    }

    /// Registers an index over `cols` of `table`, backfilling it from
    /// the table's current records.
    ///
    /// Backfill runs under the system transaction with a lock-free
    /// context; registration precedes concurrent access.
    pub fn register_index(
        &mut self,
        table: &str,
        cols: &[&str],
        index: I,
    ) -> Result<(), CatalogError> {
        let meta = self
            .tables
            .get_mut(table)
            .ok_or_else(|| CatalogError::TableNotFound(table.to_string()))?;

        let name = index_name(table, cols);
        if self.indexes.contains_key(&name) {
            return Err(CatalogError::IndexExists(name));
        }

        let mut index_cols = Vec::with_capacity(cols.len());
        for col in cols {
            let col_meta = meta
                .cols
                .iter()
                .find(|c| c.name == *col)
                .ok_or_else(|| CatalogError::UnknownColumn {
                    table: table.to_string(),
                    column: col.to_string(),
                })?;
            index_cols.push(col_meta.clone());
        }
        let index_meta = IndexMeta {
            name: name.clone(),
            total_len: index_cols.iter().map(|c| c.len).sum(),
            cols: index_cols,
        };

        // Backfill from a full scan of the existing records.
        let file = &self.files[table];
        let bootstrap = Transaction::new(TxnId::INVALID);
        let ctx = Context::recovery(&bootstrap);
        let mut scan = RecordScan::new(file)?;
        while !scan.is_end() {
            let rid = scan.rid();
            let record = file.get_record(rid, &ctx)?;
            index.insert_entry(&index_meta.key_of(&record), rid, &bootstrap)?;
            scan.next()?;
        }

        meta.indexes.push(index_meta);
        self.indexes.insert(name, index);
        Ok(())
    }

    /// Looks up a table's schema.
    pub fn table(&self, name: &str) -> Result<&TableMeta, CatalogError> {
        self.tables
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    /// Looks up a table's heap file handle.
    pub fn file(&self, name: &str) -> Result<&F, CatalogError> {
        self.files
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    /// Looks up an index handle by its catalog name.
    pub fn index(&self, name: &str) -> Result<&I, CatalogError> {
        self.indexes
            .get(name)
            .ok_or_else(|| CatalogError::IndexNotFound(name.to_string()))
    }
}

impl<F: TableFile, I: IndexFile> Default for SystemCatalog<F, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCatalog<MemoryTable, MemoryIndex> {
    /// Creates a memory-backed table from its schema.
    pub fn create_table(&mut self, meta: TableMeta) -> Result<(), CatalogError> {
        let file = MemoryTable::new(self.next_table_id, meta.record_size());
        self.next_table_id += 1;
        self.register_table(meta, file)
    }

    /// Creates a memory-backed index over `cols` of `table`.
    pub fn create_index(&mut self, table: &str, cols: &[&str]) -> Result<(), CatalogError> {
        self.register_index(table, cols, MemoryIndex::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::ColType;
    use crate::heap::Rid;

    fn users() -> TableMeta {
        TableMeta::new("users")
            .add_column("id", ColType::Int, 0)
            .add_column("name", ColType::Str, 8)
    }

    #[test]
    fn test_index_name_format() {
        assert_eq!(index_name("users", &["name"]), "users_name");
        assert_eq!(index_name("users", &["name", "id"]), "users_name_id");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = SystemCatalog::new();
        catalog.create_table(users()).unwrap();
        catalog.create_index("users", &["id"]).unwrap();

        assert_eq!(catalog.table("users").unwrap().record_size(), 12);
        assert!(catalog.index("users_id").is_ok());
        assert!(matches!(
            catalog.table("ghosts"),
            Err(CatalogError::TableNotFound(_))
        ));
        assert!(matches!(
            catalog.index("users_name"),
            Err(CatalogError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_double_registration_fails() {
        let mut catalog = SystemCatalog::new();
        catalog.create_table(users()).unwrap();
        assert!(matches!(
            catalog.create_table(users()),
            Err(CatalogError::TableExists(_))
        ));

        catalog.create_index("users", &["id"]).unwrap();
        assert!(matches!(
            catalog.create_index("users", &["id"]),
            Err(CatalogError::IndexExists(_))
        ));
    }

    #[test]
    fn test_index_over_unknown_column_fails() {
        let mut catalog = SystemCatalog::new();
        catalog.create_table(users()).unwrap();
        assert!(matches!(
            catalog.create_index("users", &["ghost"]),
            Err(CatalogError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_index_backfill_covers_existing_records() {
        let mut catalog = SystemCatalog::new();
        catalog.create_table(users()).unwrap();

        // Insert before the index exists.
        let bootstrap = Transaction::new(TxnId::INVALID);
        let ctx = Context::recovery(&bootstrap);
        let file = catalog.file("users").unwrap();
        let mut rec = vec![0u8; 12];
        rec[..4].copy_from_slice(&5i32.to_le_bytes());
        let rid = file.insert_record(&rec, &ctx).unwrap();

        catalog.create_index("users", &["id"]).unwrap();

        let index = catalog.index("users_id").unwrap();
        assert_eq!(index.get(&5i32.to_le_bytes()), Some(rid));
        assert_eq!(index.get(&1i32.to_le_bytes()), None);
        assert_eq!(rid, Rid::new(1, 0));
    }
}
