//! Table registry.
//!
//! Maps table IDs and names to the files that store them. One catalog is
//! shared by a page cache and its callers; there is no process-wide
//! instance.

use crate::error::{Result, StorageError};
use crate::storage::DbFile;
use crate::types::{Schema, TableId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct TableEntry {
    file: Arc<dyn DbFile>,
    name: String,
    primary_key: String,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, TableEntry>,
    by_name: HashMap<String, TableId>,
}

/// Registry of the tables known to a database
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table stored in `file`.
    ///
    /// If a table with the same name exists, the new table replaces it.
    pub fn add_table(
        &self,
        file: Arc<dyn DbFile>,
        name: impl Into<String>,
        primary_key: impl Into<String>,
    ) {
        let name = name.into();
        let id = file.id();
        let mut tables = self.tables.write();

        if let Some(old_id) = tables.by_name.remove(&name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            tables.by_name.remove(&old.name);
        }

        tables.by_name.insert(name.clone(), id);
        tables.by_id.insert(
            id,
            TableEntry {
                file,
                name,
                primary_key: primary_key.into(),
            },
        );
    }

    /// ID of the table with the given name
    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::TableNotFound(name.to_owned()))
    }

    /// File storing the table
    pub fn file(&self, table_id: TableId) -> Result<Arc<dyn DbFile>> {
        self.with_entry(table_id, |entry| Arc::clone(&entry.file))
    }

    /// Schema of the table
    pub fn schema(&self, table_id: TableId) -> Result<Arc<Schema>> {
        self.with_entry(table_id, |entry| Arc::clone(entry.file.schema()))
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.with_entry(table_id, |entry| entry.name.clone())
    }

    pub fn primary_key(&self, table_id: TableId) -> Result<String> {
        self.with_entry(table_id, |entry| entry.primary_key.clone())
    }

    /// IDs of all registered tables
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().by_id.keys().copied().collect()
    }

    /// Remove every table
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }

    fn with_entry<T>(&self, table_id: TableId, f: impl FnOnce(&TableEntry) -> T) -> Result<T> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(f)
            .ok_or_else(|| StorageError::table_not_found(table_id))
    }
}
