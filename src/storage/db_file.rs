//! Table file abstraction.
//!
//! The page cache and the catalog talk to table files only through these
//! traits so that the storage backend can be swapped or mocked for tests.

use crate::buffer::{PageCache, SharedPage};
use crate::error::Result;
use crate::page::HeapPage;
use crate::types::{PageId, Schema, TableId, TransactionId, Tuple};
use std::sync::Arc;

/// Trait for the on-disk representation of one table
pub trait DbFile: Send + Sync {
    /// Stable identity of this file, used as the table ID of its pages
    fn id(&self) -> TableId;

    /// Schema of the tuples stored in this file
    fn schema(&self) -> &Arc<Schema>;

    /// Read and decode a page from disk
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Encode and write a page to disk
    fn write_page(&self, page: &HeapPage) -> Result<()>;

    /// Number of pages currently in the file
    fn num_pages(&self) -> Result<usize>;

    /// Insert a tuple, returning the pages that were modified
    fn insert_tuple(
        &self,
        cache: &PageCache,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>>;

    /// Delete a tuple, returning the pages that were modified
    fn delete_tuple(
        &self,
        cache: &PageCache,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<SharedPage>>;

    /// Iterate over every tuple in the file
    fn iterator<'a>(&'a self, cache: &'a PageCache, tid: TransactionId)
        -> Box<dyn DbFileIterator + 'a>;
}

/// Restartable cursor over the tuples of a file
pub trait DbFileIterator {
    /// Position the cursor before the first tuple
    fn open(&mut self) -> Result<()>;

    /// Check whether another tuple is available
    fn has_next(&mut self) -> Result<bool>;

    /// Return the next tuple, or [`StorageError::NoSuchElement`] when
    /// exhausted
    ///
    /// [`StorageError::NoSuchElement`]: crate::StorageError::NoSuchElement
    fn next_tuple(&mut self) -> Result<Tuple>;

    /// Restart from the first page
    fn rewind(&mut self) -> Result<()>;

    /// Release the cursor; it yields nothing until reopened
    fn close(&mut self);
}
