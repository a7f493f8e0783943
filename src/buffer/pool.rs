//! Page cache implementation.
//!
//! The page cache holds a bounded number of heap pages in memory. Every page
//! read goes through [`PageCache::get`]; a miss loads the page from the file
//! registered for its table in the catalog. When the cache is full one clean
//! page is evicted, lowest use count first. Dirty pages are never evicted
//! (no-steal); they leave memory only by being flushed or discarded.
//!
//! Callers must not hold a page lock while calling into the cache.

use crate::buffer::{EvictionIndex, LockManager, NoopLockManager};
use crate::error::{Result, StorageError};
use crate::page::HeapPage;
use crate::storage::Catalog;
use crate::types::{PageId, Permissions, TableId, TransactionId, Tuple};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A resident page shared between the cache and its callers
pub type SharedPage = Arc<RwLock<HeapPage>>;

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fetches served from memory
    pub hits: u64,
    /// Fetches that loaded a page from its file
    pub misses: u64,
    /// Pages evicted to make room
    pub evictions: u64,
    /// Pages currently resident
    pub resident: usize,
    /// Maximum number of resident pages
    pub capacity: usize,
}

/// Everything guarded by the cache lock
struct CacheState {
    frames: HashMap<PageId, SharedPage>,
    eviction: EvictionIndex,
    /// Pages being read from disk; at most one reader per page
    loading: HashSet<PageId>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    /// Serve a resident page, marking it dirty for write access
    fn hit(&mut self, tid: TransactionId, page_id: PageId, perm: Permissions) -> Option<SharedPage> {
        let page = self.frames.get(&page_id).cloned()?;
        self.eviction.access(page_id);
        self.hits += 1;
        if perm.is_write() {
            page.write().mark_dirty(true, Some(tid));
        }
        Some(page)
    }

    /// Evict the first clean, unlocked page in eviction order
    fn evict_one(&mut self) -> Result<()> {
        let victim = self.eviction.candidates().find(|page_id| {
            self.frames
                .get(page_id)
                .and_then(|frame| frame.try_read())
                .map_or(false, |page| !page.is_dirty())
        });

        let page_id = victim.ok_or(StorageError::PoolExhausted)?;
        self.frames.remove(&page_id);
        self.eviction.remove(page_id);
        self.evictions += 1;
        Ok(())
    }

    /// Pages currently dirty, optionally only those dirtied by `tid`
    fn dirty_pages(&self, tid: Option<TransactionId>) -> Vec<PageId> {
        self.frames
            .iter()
            .filter(|(_, frame)| {
                let page = frame.read();
                page.is_dirty() && tid.map_or(true, |tid| page.dirtier() == Some(tid))
            })
            .map(|(&page_id, _)| page_id)
            .collect()
    }
}

/// Bounded cache of heap pages
pub struct PageCache {
    catalog: Arc<Catalog>,
    lock_manager: Arc<dyn LockManager>,
    state: Mutex<CacheState>,
    /// Signalled whenever a page load finishes
    loaded: Condvar,
    /// Maximum number of resident pages
    capacity: usize,
}

impl PageCache {
    /// Create a new page cache holding at most `capacity` pages
    pub fn new(catalog: Arc<Catalog>, capacity: usize) -> Self {
        Self::with_lock_manager(catalog, capacity, Arc::new(NoopLockManager))
    }

    /// Create a page cache that consults `lock_manager` on every fetch
    pub fn with_lock_manager(
        catalog: Arc<Catalog>,
        capacity: usize,
        lock_manager: Arc<dyn LockManager>,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            catalog,
            lock_manager,
            state: Mutex::new(CacheState {
                frames: HashMap::with_capacity(capacity),
                eviction: EvictionIndex::new(capacity),
                loading: HashSet::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            loaded: Condvar::new(),
            capacity,
        }
    }

    /// Fetch a page on behalf of `tid`.
    ///
    /// A write request marks the page dirty under `tid`. On a miss with a
    /// full cache one clean page is evicted first; if every resident page is
    /// dirty the call fails with [`StorageError::PoolExhausted`] and the
    /// cache is left unchanged.
    pub fn get(&self, tid: TransactionId, page_id: PageId, perm: Permissions) -> Result<SharedPage> {
        self.lock_manager.acquire_lock(tid, page_id, perm)?;

        let mut state = self.state.lock();
        loop {
            if let Some(page) = state.hit(tid, page_id, perm) {
                return Ok(page);
            }
            if !state.loading.contains(&page_id) {
                break;
            }
            // Another thread is reading this page; wait for its copy.
            self.loaded.wait(&mut state);
        }
        state.loading.insert(page_id);
        drop(state);

        // Read outside the cache lock. The loading mark keeps every other
        // reader of this page waiting, so the image cannot go stale.
        let read = self
            .catalog
            .file(page_id.table_id())
            .and_then(|file| file.read_page(page_id));

        let mut state = self.state.lock();
        state.loading.remove(&page_id);
        self.loaded.notify_all();

        let mut loaded = read?;
        if perm.is_write() {
            loaded.mark_dirty(true, Some(tid));
        }

        if state.frames.len() >= self.capacity {
            state.evict_one()?;
        }

        let page = Arc::new(RwLock::new(loaded));
        state.frames.insert(page_id, Arc::clone(&page));
        state.eviction.access(page_id);
        state.misses += 1;
        debug_assert_eq!(state.frames.len(), state.eviction.len());
        Ok(page)
    }

    /// Release the lock `tid` holds on a page
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_manager.release_lock(tid, page_id);
    }

    /// Check whether `tid` holds a lock on a page
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds_lock(tid, page_id)
    }

    /// Finish a transaction.
    ///
    /// On commit the pages it dirtied are flushed; on abort they are dropped
    /// from the cache so the next fetch rereads the last flushed image.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            let dirty = self.state.lock().dirty_pages(Some(tid));
            for page_id in dirty {
                self.discard(page_id);
            }
        }
        self.lock_manager.release_locks(tid);
        Ok(())
    }

    /// Insert a tuple into the table `table_id` on behalf of `tid`
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>> {
        let file = self.catalog.file(table_id)?;
        file.insert_tuple(self, tid, tuple)
    }

    /// Delete a tuple from the table its record ID points into
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &mut Tuple) -> Result<Vec<SharedPage>> {
        let record_id = tuple.record_id().ok_or(StorageError::TupleNotFound)?;
        let file = self.catalog.file(record_id.page_id().table_id())?;
        file.delete_tuple(self, tid, tuple)
    }

    /// Remove a page without flushing it, dirty or not
    pub fn discard(&self, page_id: PageId) {
        let mut state = self.state.lock();
        state.frames.remove(&page_id);
        state.eviction.remove(page_id);
    }

    /// Write a resident page to its file and mark it clean
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let Some(page) = self.state.lock().frames.get(&page_id).cloned() else {
            return Ok(());
        };
        let file = self.catalog.file(page_id.table_id())?;

        let mut page = page.write();
        file.write_page(&page)?;
        page.mark_dirty(false, None);
        Ok(())
    }

    /// Flush every dirty resident page
    pub fn flush_all(&self) -> Result<()> {
        let dirty = self.state.lock().dirty_pages(None);
        for page_id in dirty {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Flush every resident page dirtied by `tid`
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let dirty = self.state.lock().dirty_pages(Some(tid));
        for page_id in dirty {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Maximum number of resident pages
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.state.lock().frames.contains_key(&page_id)
    }

    /// Use count of a resident page
    pub fn use_count(&self, page_id: PageId) -> Option<u64> {
        self.state.lock().eviction.use_count(page_id)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            resident: state.frames.len(),
            capacity: self.capacity,
        }
    }

    /// The catalog this cache resolves table IDs through
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DbFile, HeapFile};
    use crate::test_utils::{people, row, Fixture};
    use crate::types::{Field, PAGE_SIZE};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Append `n` empty pages to the fixture table
    fn grow(fx: &Fixture, n: u32) -> Result<Vec<PageId>> {
        let start = fx.file.num_pages()? as u32;
        (start..start + n)
            .map(|number| -> Result<PageId> {
                let page_id = PageId::new(fx.file.id(), number);
                fx.file
                    .write_page(&HeapPage::empty(page_id, people(), PAGE_SIZE)?)?;
                Ok(page_id)
            })
            .collect()
    }

    fn read(fx: &Fixture, page_id: PageId) -> Result<SharedPage> {
        fx.cache.get(fx.tid, page_id, Permissions::ReadOnly)
    }

    fn write(fx: &Fixture, page_id: PageId) -> Result<SharedPage> {
        fx.cache.get(fx.tid, page_id, Permissions::ReadWrite)
    }

    #[test]
    fn test_hit_returns_same_page() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 1)?;

        let first = read(&fx, pages[0])?;
        let second = read(&fx, pages[0])?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fx.cache.use_count(pages[0]), Some(2));

        let stats = fx.cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.resident), (1, 1, 1));
        Ok(())
    }

    #[test]
    fn test_write_access_marks_dirty() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 2)?;

        let page = write(&fx, pages[0])?;
        assert!(page.read().is_dirty());
        assert_eq!(page.read().dirtier(), Some(fx.tid));

        // a hit upgrades a clean page too
        assert!(!read(&fx, pages[1])?.read().is_dirty());
        assert!(write(&fx, pages[1])?.read().is_dirty());
        Ok(())
    }

    #[test]
    fn test_evicts_least_used_page() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 3)?;
        let (a, b, c) = (pages[0], pages[1], pages[2]);

        read(&fx, a)?;
        read(&fx, a)?;
        read(&fx, b)?;
        read(&fx, a)?;
        assert_eq!(fx.cache.use_count(a), Some(3));
        assert_eq!(fx.cache.use_count(b), Some(1));

        read(&fx, c)?;
        assert!(fx.cache.is_resident(a));
        assert!(!fx.cache.is_resident(b));
        assert!(fx.cache.is_resident(c));
        assert_eq!(fx.cache.stats().evictions, 1);
        Ok(())
    }

    #[test]
    fn test_ties_evict_oldest() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 3)?;

        read(&fx, pages[0])?;
        read(&fx, pages[1])?;
        read(&fx, pages[2])?;
        assert!(!fx.cache.is_resident(pages[0]));
        assert!(fx.cache.is_resident(pages[1]));
        Ok(())
    }

    #[test]
    fn test_dirty_pages_are_never_evicted() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 3)?;
        let (a, b, c) = (pages[0], pages[1], pages[2]);

        write(&fx, a)?;
        for _ in 0..3 {
            read(&fx, b)?;
        }

        read(&fx, c)?;
        assert!(fx.cache.is_resident(a));
        assert!(!fx.cache.is_resident(b));
        Ok(())
    }

    #[test]
    fn test_exhausted_when_all_dirty() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 3)?;

        write(&fx, pages[0])?;
        write(&fx, pages[1])?;
        let before = fx.cache.stats();

        assert!(matches!(
            read(&fx, pages[2]),
            Err(StorageError::PoolExhausted)
        ));
        assert_eq!(fx.cache.stats(), before);
        assert!(fx.cache.is_resident(pages[0]));
        assert!(fx.cache.is_resident(pages[1]));
        assert!(!fx.cache.is_resident(pages[2]));

        // flushing frees a victim
        fx.cache.flush_page(pages[0])?;
        read(&fx, pages[2])?;
        assert!(!fx.cache.is_resident(pages[0]));
        Ok(())
    }

    #[test]
    fn test_write_locked_page_is_skipped() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 3)?;

        let a = read(&fx, pages[0])?;
        read(&fx, pages[1])?;
        read(&fx, pages[1])?;

        let guard = a.write();
        read(&fx, pages[2])?;
        drop(guard);

        assert!(fx.cache.is_resident(pages[0]));
        assert!(!fx.cache.is_resident(pages[1]));
        Ok(())
    }

    #[test]
    fn test_capacity_is_never_exceeded() -> Result<()> {
        let fx = Fixture::new(3, PAGE_SIZE);
        let pages = grow(&fx, 10)?;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let page_id = pages[rng.gen_range(0..pages.len())];
            read(&fx, page_id)?;
            assert!(fx.cache.len() <= fx.cache.capacity());
            assert!(fx.cache.is_resident(page_id));
        }
        Ok(())
    }

    #[test]
    fn test_failed_read_caches_nothing() {
        let fx = Fixture::new(2, PAGE_SIZE);
        let missing = PageId::new(fx.file.id(), 5);
        assert!(matches!(read(&fx, missing), Err(StorageError::Io(_))));
        assert!(fx.cache.is_empty());

        let unknown = PageId::new(fx.file.id().wrapping_add(1), 0);
        assert!(matches!(
            read(&fx, unknown),
            Err(StorageError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_page_caches_nothing() -> Result<()> {
        let fx = Fixture::new(2, PAGE_SIZE);
        let pages = grow(&fx, 1)?;

        // slot 0 occupied, but its text length prefix overflows TEXT(32)
        let mut image = HeapPage::empty_page_data(PAGE_SIZE);
        image[0] = 0x01;
        image[19..23].copy_from_slice(&1000u32.to_be_bytes());
        std::fs::write(fx.file.path(), &image)?;

        assert!(matches!(read(&fx, pages[0]), Err(StorageError::Decode(_))));
        assert!(!fx.cache.is_resident(pages[0]));
        assert!(fx.cache.is_empty());
        assert_eq!(fx.cache.stats().misses, 0);

        // the failed load does not block the next one
        assert!(matches!(read(&fx, pages[0]), Err(StorageError::Decode(_))));
        Ok(())
    }

    #[test]
    fn test_discard_drops_unflushed_changes() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 1)?;

        write(&fx, pages[0])?.write().insert_tuple(&mut row(1, "a"))?;
        fx.cache.discard(pages[0]);
        assert!(!fx.cache.is_resident(pages[0]));
        assert_eq!(fx.cache.use_count(pages[0]), None);

        let page = read(&fx, pages[0])?;
        assert_eq!(page.read().iter().count(), 0);
        assert!(!page.read().is_dirty());
        Ok(())
    }

    #[test]
    fn test_flush_page_persists_and_cleans() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 1)?;

        let page = write(&fx, pages[0])?;
        page.write().insert_tuple(&mut row(7, "g"))?;
        fx.cache.flush_page(pages[0])?;

        assert!(!page.read().is_dirty());
        assert_eq!(page.read().dirtier(), None);
        let on_disk = fx.file.read_page(pages[0])?;
        assert_eq!(on_disk.tuple(0).unwrap().field(0)?, &Field::Int(7));

        // not resident: nothing to do
        fx.cache.discard(pages[0]);
        fx.cache.flush_page(pages[0])?;
        Ok(())
    }

    #[test]
    fn test_flush_all_writes_every_dirty_page() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 3)?;

        for (i, &page_id) in pages.iter().enumerate() {
            let page = write(&fx, page_id)?;
            page.write().insert_tuple(&mut row(i as i32, "z"))?;
        }
        fx.cache.flush_all()?;

        let reopened = HeapFile::open(fx.file.path(), people(), PAGE_SIZE, false)?;
        for (i, &page_id) in pages.iter().enumerate() {
            assert!(!read(&fx, page_id)?.read().is_dirty());
            let on_disk = reopened.read_page(page_id)?;
            assert_eq!(on_disk.tuple(0).unwrap().field(0)?, &Field::Int(i as i32));
        }
        Ok(())
    }

    #[test]
    fn test_commit_flushes_own_pages_only() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let pages = grow(&fx, 2)?;
        let other = TransactionId::new();

        write(&fx, pages[0])?;
        fx.cache.get(other, pages[1], Permissions::ReadWrite)?;

        fx.cache.transaction_complete(fx.tid, true)?;
        assert!(!read(&fx, pages[0])?.read().is_dirty());
        assert!(read(&fx, pages[1])?.read().is_dirty());
        Ok(())
    }

    #[test]
    fn test_abort_discards_own_pages() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        fx.insert(row(1, "kept"))?;
        fx.cache.flush_all()?;

        let tid = TransactionId::new();
        let mut t = row(2, "dropped");
        fx.cache.insert_tuple(tid, fx.file.id(), &mut t)?;
        fx.cache.transaction_complete(tid, false)?;

        assert_eq!(fx.scan()?, vec![row(1, "kept")]);
        Ok(())
    }

    #[test]
    fn test_insert_and_delete_through_catalog() -> Result<()> {
        let fx = Fixture::new(4, PAGE_SIZE);
        let mut t = row(3, "c");
        let pages = fx.cache.insert_tuple(fx.tid, fx.file.id(), &mut t)?;
        assert_eq!(pages.len(), 1);
        assert!(t.record_id().is_some());

        fx.cache.delete_tuple(fx.tid, &mut t)?;
        assert!(fx.scan()?.is_empty());

        // no record ID: nowhere to delete from
        assert!(matches!(
            fx.cache.delete_tuple(fx.tid, &mut row(3, "c")),
            Err(StorageError::TupleNotFound)
        ));
        assert!(matches!(
            fx.cache.insert_tuple(fx.tid, fx.file.id().wrapping_add(1), &mut row(4, "d")),
            Err(StorageError::TableNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_zero_capacity_rounds_up() {
        let fx = Fixture::new(0, PAGE_SIZE);
        assert_eq!(fx.cache.capacity(), 1);
        let stats = fx.cache.stats();
        assert_eq!(stats.capacity, 1);
        assert_eq!(stats.resident, 0);
    }
}
