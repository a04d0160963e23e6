//! Table and index metadata, and the system catalog.
//!
//! The catalog owns every table's schema ([`TableMeta`]), its heap
//! file handle, and the handles of its secondary indexes. Executors
//! resolve names through it and never hold storage handles of their
//! own.

pub mod core;
pub mod error;
pub mod schema;

pub use self::core::{index_name, SystemCatalog};
pub use error::CatalogError;
pub use schema::{ColumnMeta, IndexMeta, TableMeta};
