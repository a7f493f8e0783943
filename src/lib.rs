//! # Heap Storage Engine
//!
//! A disk-based heap-file storage engine with a bounded page cache, designed
//! as the bottom layer of a relational database.
//!
//! ## Architecture
//!
//! The storage engine is composed of modular, swappable components:
//!
//! - **Types** (`types`): Field values, schemas, tuples and identifiers
//! - **Page Layer** (`page`): Fixed-size heap pages with an occupancy bitmap
//! - **Storage Layer** (`storage`): Heap files, sequential scans and the catalog
//! - **Page Cache** (`buffer`): Frequency-first eviction with a no-steal policy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use heap_storage::{Config, Database, FieldType, Schema, Tuple, TransactionId};
//!
//! let db = Database::open(Config::default().cache_capacity(100))?;
//! let schema = Arc::new(Schema::named([(FieldType::Int, "id"), (FieldType::Text(32), "name")])?);
//! let people = db.open_table("people.dat", schema.clone(), "people", "id")?;
//!
//! // Insert a row
//! let tid = TransactionId::new();
//! let mut row = Tuple::new(schema, vec![1.into(), "ann".into()])?;
//! db.cache().insert_tuple(tid, people.id(), &mut row)?;
//!
//! // Scan the table
//! for tuple in people.iter(db.cache(), tid) {
//!     println!("{}", tuple?);
//! }
//!
//! // Make everything durable
//! db.cache().transaction_complete(tid, true)?;
//! ```

pub mod buffer;
pub mod error;
pub mod page;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use error::{Result, StorageError};
pub use types::{
    Field, FieldType, PageId, Permissions, RecordId, Schema, TableId, TransactionId, Tuple,
    DEFAULT_CACHE_PAGES, PAGE_SIZE,
};

// Re-export main public API
pub use buffer::{CacheStats, LockManager, NoopLockManager, PageCache, SharedPage};
pub use page::HeapPage;
pub use storage::{Catalog, DbFile, DbFileIterator, HeapFile};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Size of every page in bytes (default: 4096)
    pub page_size: usize,
    /// Page cache size in number of pages (default: 50)
    pub cache_capacity: usize,
    /// Whether to sync writes immediately (default: false for performance)
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            cache_capacity: DEFAULT_CACHE_PAGES,
            sync_on_write: false,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|e| StorageError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the page size; intended for tests that want small pages
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set page cache size
    pub fn cache_capacity(mut self, pages: usize) -> Self {
        self.cache_capacity = pages;
        self
    }

    /// Enable sync on write for durability
    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.sync_on_write = enabled;
        self
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(StorageError::config("page size must be positive"));
        }
        if self.cache_capacity == 0 {
            return Err(StorageError::config("cache capacity must be positive"));
        }
        Ok(())
    }
}

/// Database context owning one catalog and one page cache.
///
/// Every table opened through a `Database` shares its cache. Separate
/// instances share nothing, so tests can run side by side.
pub struct Database {
    catalog: Arc<Catalog>,
    cache: PageCache,
    config: Config,
}

impl Database {
    /// Create a database context with a no-op lock manager
    pub fn open(config: Config) -> Result<Self> {
        Self::with_lock_manager(config, Arc::new(NoopLockManager))
    }

    /// Create a database context whose cache consults `lock_manager`
    pub fn with_lock_manager(config: Config, lock_manager: Arc<dyn LockManager>) -> Result<Self> {
        config.validate()?;
        let catalog = Arc::new(Catalog::new());
        let cache =
            PageCache::with_lock_manager(Arc::clone(&catalog), config.cache_capacity, lock_manager);

        Ok(Self {
            catalog,
            cache,
            config,
        })
    }

    /// Open or create the heap file at `path` and register it as `name`
    pub fn open_table(
        &self,
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        name: &str,
        primary_key: &str,
    ) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(
            path,
            schema,
            self.config.page_size,
            self.config.sync_on_write,
        )?);
        self.catalog.add_table(file.clone(), name, primary_key);
        Ok(file)
    }

    /// Look up a registered table by name
    pub fn table(&self, name: &str) -> Result<Arc<dyn DbFile>> {
        self.catalog.file(self.catalog.table_id(name)?)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flush all dirty pages to disk
    pub fn flush(&self) -> Result<()> {
        self.cache.flush_all()
    }

    /// Get statistics about the database
    pub fn stats(&self) -> Result<DbStats> {
        let mut page_count = 0;
        let table_ids = self.catalog.table_ids();
        for &table_id in &table_ids {
            page_count += self.catalog.file(table_id)?.num_pages()?;
        }

        Ok(DbStats {
            table_count: table_ids.len(),
            page_count,
            cache: self.cache.stats(),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbStats {
    /// Number of registered tables
    pub table_count: usize,
    /// Total number of pages across all tables
    pub page_count: usize,
    /// Page cache counters
    pub cache: CacheStats,
}
