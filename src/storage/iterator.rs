//! Sequential scan over a heap file.

use crate::buffer::PageCache;
use crate::error::{Result, StorageError};
use crate::storage::{DbFile, DbFileIterator, HeapFile};
use crate::types::{PageId, Permissions, TransactionId, Tuple};

/// Lazy cursor over every tuple of a heap file.
///
/// Pages are fetched read-only through the cache one at a time, in page
/// number order; pages without tuples are skipped.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    cache: &'a PageCache,
    tid: TransactionId,
    /// Next page to load
    next_page: usize,
    /// Tuples of the current page not yet returned
    buffered: std::vec::IntoIter<Tuple>,
    closed: bool,
}

impl<'a> HeapFileIterator<'a> {
    pub(crate) fn new(file: &'a HeapFile, cache: &'a PageCache, tid: TransactionId) -> Self {
        Self {
            file,
            cache,
            tid,
            next_page: 0,
            buffered: Vec::new().into_iter(),
            closed: false,
        }
    }

    /// Copy the tuples out of one page so no page lock outlives this call
    fn load_page(&self, page_number: usize) -> Result<Vec<Tuple>> {
        let page_id = PageId::new(self.file.id(), page_number as u32);
        let page = self.cache.get(self.tid, page_id, Permissions::ReadOnly)?;
        let guard = page.read();
        Ok(guard.iter().cloned().collect())
    }
}

impl DbFileIterator for HeapFileIterator<'_> {
    fn open(&mut self) -> Result<()> {
        self.next_page = 0;
        self.buffered = Vec::new().into_iter();
        self.closed = false;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        loop {
            if !self.buffered.as_slice().is_empty() {
                return Ok(true);
            }
            if self.next_page >= self.file.num_pages()? {
                return Ok(false);
            }
            self.buffered = self.load_page(self.next_page)?.into_iter();
            self.next_page += 1;
        }
    }

    fn next_tuple(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(StorageError::NoSuchElement);
        }
        self.buffered.next().ok_or(StorageError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.buffered = Vec::new().into_iter();
        self.closed = true;
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_tuple()),
            Ok(false) => None,
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}
