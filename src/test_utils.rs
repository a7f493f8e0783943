//! Shared fixtures for unit tests.

use crate::buffer::{PageCache, SharedPage};
use crate::error::Result;
use crate::storage::{Catalog, DbFile, HeapFile};
use crate::types::{Field, FieldType, PageId, Permissions, Schema, TransactionId, Tuple};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// `[INT id, TEXT(32) name]`
pub fn people() -> Arc<Schema> {
    Arc::new(Schema::named([(FieldType::Int, "id"), (FieldType::Text(32), "name")]).unwrap())
}

/// A free-standing row of [`people`]
pub fn row(id: i32, name: &str) -> Tuple {
    Tuple::new(people(), vec![Field::Int(id), Field::from(name)]).unwrap()
}

/// One registered `people` table with its own catalog and cache
pub struct Fixture {
    pub dir: TempDir,
    pub catalog: Arc<Catalog>,
    pub cache: PageCache,
    pub file: Arc<HeapFile>,
    pub tid: TransactionId,
}

impl Fixture {
    pub fn new(capacity: usize, page_size: usize) -> Self {
        let dir = tempdir().unwrap();
        let catalog = Arc::new(Catalog::new());
        let cache = PageCache::new(Arc::clone(&catalog), capacity);

        let file = Arc::new(
            HeapFile::open(dir.path().join("table.dat"), people(), page_size, false).unwrap(),
        );
        catalog.add_table(file.clone(), "people", "id");

        Self {
            dir,
            catalog,
            cache,
            file,
            tid: TransactionId::new(),
        }
    }

    /// Open another table in the fixture directory and register it
    pub fn open_table(&self, name: &str, schema: Arc<Schema>) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(
            self.dir.path().join(name),
            schema,
            self.file.page_size(),
            false,
        )?);
        self.catalog.add_table(file.clone(), name, "");
        Ok(file)
    }

    pub fn insert(&self, mut tuple: Tuple) -> Result<Vec<SharedPage>> {
        self.file.insert_tuple(&self.cache, self.tid, &mut tuple)
    }

    /// Every tuple of the fixture table, in scan order
    pub fn scan(&self) -> Result<Vec<Tuple>> {
        self.file.iter(&self.cache, self.tid).collect()
    }

    /// Fetch page `n` of the fixture table read-only
    pub fn page(&self, n: u32) -> SharedPage {
        self.cache
            .get(self.tid, PageId::new(self.file.id(), n), Permissions::ReadOnly)
            .unwrap()
    }
}
