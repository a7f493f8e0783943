//! Heap file implementation.
//!
//! A heap file stores one table as a flat array of fixed-size pages. Page
//! `n` lives at byte offset `n * page_size`, so the file length is always a
//! multiple of the page size. Tuple-level operations fetch pages only
//! through the page cache so that eviction bookkeeping stays consistent.

use crate::buffer::{PageCache, SharedPage};
use crate::error::{Result, StorageError};
use crate::page::{HeapPage, PageLayout};
use crate::storage::{DbFile, DbFileIterator, HeapFileIterator};
use crate::types::{PageId, Permissions, Schema, TableId, TransactionId, Tuple};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File-backed table of heap pages
pub struct HeapFile {
    /// Absolute path of the backing file
    path: PathBuf,
    /// Table ID derived from the absolute path
    id: TableId,
    schema: Arc<Schema>,
    page_size: usize,
    /// The backing file; the lock also serializes appends
    file: Mutex<File>,
    /// Whether to sync on each write
    sync_on_write: bool,
}

impl HeapFile {
    /// Open or create the heap file at `path`
    pub fn open(
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        page_size: usize,
        sync_on_write: bool,
    ) -> Result<Self> {
        PageLayout::new(&schema, page_size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let len = file.metadata()?.len();
        if len % page_size as u64 != 0 {
            return Err(StorageError::decode(format!(
                "file length {} is not a multiple of page size {}",
                len, page_size
            )));
        }

        let path = fs::canonicalize(path.as_ref())?;
        let id = table_id_for(&path);

        Ok(Self {
            path,
            id,
            schema,
            page_size,
            file: Mutex::new(file),
            sync_on_write,
        })
    }

    /// Absolute path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Iterate over every tuple in page order
    pub fn iter<'a>(&'a self, cache: &'a PageCache, tid: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, cache, tid)
    }

    /// Append an empty page to the end of the file
    fn allocate_page(&self) -> Result<PageId> {
        let mut file = self.file.lock();
        let page_number = file.metadata()?.len() / self.page_size as u64;
        let page_id = PageId::new(self.id, page_number as u32);

        file.seek(SeekFrom::Start(page_id.file_offset(self.page_size)))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;

        if self.sync_on_write {
            file.sync_data()?;
        }

        Ok(page_id)
    }

    /// Insert into `page_id` fetched for writing; `None` if the page filled up
    fn try_insert(
        &self,
        cache: &PageCache,
        tid: TransactionId,
        page_id: PageId,
        tuple: &mut Tuple,
    ) -> Result<Option<SharedPage>> {
        let page = cache.get(tid, page_id, Permissions::ReadWrite)?;
        {
            let mut guard = page.write();
            match guard.insert_tuple(tuple) {
                Ok(_) => guard.mark_dirty(true, Some(tid)),
                Err(StorageError::PageFull { .. }) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        Ok(Some(page))
    }

    fn check_owner(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id() != self.id {
            return Err(StorageError::invalid_operation(format!(
                "page {} does not belong to table {}",
                page_id, self.id
            )));
        }
        Ok(())
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_owner(page_id)?;

        let mut buf = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(page_id.file_offset(self.page_size)))?;
            file.read_exact(&mut buf)?;
        }

        HeapPage::decode(page_id, Arc::clone(&self.schema), self.page_size, &buf)
    }

    fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.check_owner(page.page_id())?;

        let data = page.encode();
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page.page_id().file_offset(self.page_size)))?;
        file.write_all(&data)?;

        if self.sync_on_write {
            file.sync_data()?;
        }

        Ok(())
    }

    fn num_pages(&self) -> Result<usize> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / self.page_size as u64) as usize)
    }

    fn insert_tuple(
        &self,
        cache: &PageCache,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>> {
        if tuple.schema().as_ref() != self.schema.as_ref() {
            return Err(StorageError::SchemaMismatch);
        }

        loop {
            for page_number in 0..self.num_pages()? {
                let page_id = PageId::new(self.id, page_number as u32);
                let has_room = cache
                    .get(tid, page_id, Permissions::ReadOnly)?
                    .read()
                    .empty_slot_count()
                    > 0;
                if !has_room {
                    continue;
                }
                if let Some(page) = self.try_insert(cache, tid, page_id, tuple)? {
                    return Ok(vec![page]);
                }
            }

            // No existing page has room; a fresh page only fails if another
            // writer filled it first, in which case scan again.
            let page_id = self.allocate_page()?;
            if let Some(page) = self.try_insert(cache, tid, page_id, tuple)? {
                return Ok(vec![page]);
            }
        }
    }

    fn delete_tuple(
        &self,
        cache: &PageCache,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>> {
        for page_number in 0..self.num_pages()? {
            let page_id = PageId::new(self.id, page_number as u32);
            let found = cache
                .get(tid, page_id, Permissions::ReadOnly)?
                .read()
                .iter()
                .any(|t| t == &*tuple);
            if !found {
                continue;
            }

            let page = cache.get(tid, page_id, Permissions::ReadWrite)?;
            {
                let mut guard = page.write();
                match guard.delete_tuple(tuple) {
                    Ok(()) => guard.mark_dirty(true, Some(tid)),
                    Err(StorageError::TupleNotFound) => continue,
                    Err(e) => return Err(e),
                }
            }
            return Ok(vec![page]);
        }

        Err(StorageError::TupleNotFound)
    }

    fn iterator<'a>(
        &'a self,
        cache: &'a PageCache,
        tid: TransactionId,
    ) -> Box<dyn DbFileIterator + 'a> {
        Box::new(self.iter(cache, tid))
    }
}

/// Derive a stable table ID from an absolute path
fn table_id_for(path: &Path) -> TableId {
    crc32fast::hash(path.to_string_lossy().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{people, row, Fixture};
    use crate::types::{Field, FieldType, PAGE_SIZE};

    #[test]
    fn test_id_is_stable_per_path() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        let again = HeapFile::open(fx.file.path(), people(), PAGE_SIZE, false)?;
        assert_eq!(again.id(), fx.file.id());

        let other = fx.open_table("other.dat", people())?;
        assert_ne!(other.id(), fx.file.id());
        Ok(())
    }

    #[test]
    fn test_new_file_is_empty() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        assert_eq!(fx.file.num_pages()?, 0);
        assert_eq!(fx.scan()?.len(), 0);
        Ok(())
    }

    #[test]
    fn test_write_and_read_page() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        let pid = PageId::new(fx.file.id(), 0);

        let mut page = HeapPage::empty(pid, people(), PAGE_SIZE)?;
        page.insert_tuple(&mut row(1, "ann"))?;
        page.insert_tuple(&mut row(2, "bob"))?;
        fx.file.write_page(&page)?;

        assert_eq!(fx.file.num_pages()?, 1);
        let len = fs::metadata(fx.file.path())?.len();
        assert_eq!(len, PAGE_SIZE as u64);

        let read = fx.file.read_page(pid)?;
        assert_eq!(read.iter().count(), 2);
        assert_eq!(read.encode(), page.encode());
        Ok(())
    }

    #[test]
    fn test_read_past_end_is_io_error() {
        let fx = Fixture::new(10, PAGE_SIZE);
        let result = fx.file.read_page(PageId::new(fx.file.id(), 3));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn test_read_foreign_page_rejected() {
        let fx = Fixture::new(10, PAGE_SIZE);
        let result = fx.file.read_page(PageId::new(fx.file.id().wrapping_add(1), 0));
        assert!(matches!(result, Err(StorageError::InvalidOperation(_))));
    }

    #[test]
    fn test_open_rejects_partial_page() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        let path = fx.dir.path().join("partial.dat");
        fs::write(&path, vec![0u8; 100])?;
        assert!(matches!(
            HeapFile::open(&path, people(), PAGE_SIZE, false),
            Err(StorageError::Decode(_))
        ));
        Ok(())
    }

    #[test]
    fn test_insert_fills_first_page_before_appending() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);

        for i in 0..113 {
            let pages = fx.insert(row(i, "x"))?;
            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0].read().page_id().page_number(), 0);
        }
        assert_eq!(fx.file.num_pages()?, 1);

        let pages = fx.insert(row(113, "x"))?;
        assert_eq!(pages[0].read().page_id().page_number(), 1);
        assert_eq!(fx.file.num_pages()?, 2);

        // a hole on page 0 is filled before page 1 grows
        let mut victim = row(5, "x");
        fx.file.delete_tuple(&fx.cache, fx.tid, &mut victim)?;
        let pages = fx.insert(row(200, "y"))?;
        let page = pages[0].read();
        assert_eq!(page.page_id().page_number(), 0);
        assert_eq!(page.tuple(5).unwrap().field(0)?, &Field::Int(200));
        Ok(())
    }

    #[test]
    fn test_insert_sets_record_id_and_dirties_page() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        let mut t = row(1, "ann");
        let pages = fx.file.insert_tuple(&fx.cache, fx.tid, &mut t)?;

        let rid = t.record_id().unwrap();
        assert_eq!(rid.page_id(), PageId::new(fx.file.id(), 0));
        assert_eq!(rid.slot(), 0);

        let page = pages[0].read();
        assert!(page.is_dirty());
        assert_eq!(page.dirtier(), Some(fx.tid));
        Ok(())
    }

    #[test]
    fn test_insert_schema_mismatch() {
        let fx = Fixture::new(10, PAGE_SIZE);
        let ints = Arc::new(Schema::anonymous([FieldType::Int]).unwrap());
        let mut t = Tuple::new(ints, vec![Field::Int(1)]).unwrap();
        assert!(matches!(
            fx.file.insert_tuple(&fx.cache, fx.tid, &mut t),
            Err(StorageError::SchemaMismatch)
        ));
        assert_eq!(fx.file.num_pages().unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_leaves_pages_untouched() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        for i in 0..(113 * 3) {
            fx.insert(row(i, "x"))?;
        }
        assert_eq!(fx.file.num_pages()?, 3);
        fx.cache.flush_all()?;

        let before: Vec<Vec<u8>> = (0..3)
            .map(|n| fx.page(n).read().encode())
            .collect();

        let mut missing = row(10_000, "nobody");
        assert!(matches!(
            fx.file.delete_tuple(&fx.cache, fx.tid, &mut missing),
            Err(StorageError::TupleNotFound)
        ));

        for (n, image) in before.iter().enumerate() {
            let page = fx.page(n as u32);
            let page = page.read();
            assert!(!page.is_dirty());
            assert_eq!(&page.encode(), image);
        }
        Ok(())
    }

    #[test]
    fn test_delete_from_later_page() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        for i in 0..150 {
            fx.insert(row(i, "x"))?;
        }

        let mut t = row(140, "x");
        let pages = fx.file.delete_tuple(&fx.cache, fx.tid, &mut t)?;
        assert_eq!(pages[0].read().page_id().page_number(), 1);
        assert_eq!(t.record_id(), None);
        assert_eq!(fx.scan()?.len(), 149);
        Ok(())
    }

    #[test]
    fn test_changes_survive_flush_and_reopen() -> Result<()> {
        let fx = Fixture::new(10, PAGE_SIZE);
        for i in 0..120 {
            fx.insert(row(i, &format!("n{}", i)))?;
        }
        fx.cache.flush_all()?;

        let reopened = HeapFile::open(fx.file.path(), people(), PAGE_SIZE, false)?;
        let p1 = reopened.read_page(PageId::new(reopened.id(), 1))?;
        assert_eq!(p1.iter().count(), 7);
        assert_eq!(p1.tuple(0).unwrap().field(1)?, &Field::from("n113"));
        Ok(())
    }
}
