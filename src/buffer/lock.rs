//! Page lock manager seam.
//!
//! The page cache asks a [`LockManager`] for permission before handing out
//! a page and tells it when a transaction finishes. Locking protocols plug
//! in behind this trait; [`NoopLockManager`] grants everything.

use crate::error::Result;
use crate::types::{PageId, Permissions, TransactionId};

/// Trait for page-level lock management
pub trait LockManager: Send + Sync {
    /// Acquire a lock on `page_id` in the given mode
    fn acquire_lock(&self, tid: TransactionId, page_id: PageId, perm: Permissions) -> Result<()>;

    /// Release one lock held by `tid`
    fn release_lock(&self, tid: TransactionId, page_id: PageId);

    /// Release every lock held by `tid`
    fn release_locks(&self, tid: TransactionId);

    /// Check whether `tid` holds a lock on `page_id`
    fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool;
}

/// Lock manager that grants every request and tracks nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLockManager;

impl LockManager for NoopLockManager {
    fn acquire_lock(&self, _tid: TransactionId, _page_id: PageId, _perm: Permissions) -> Result<()> {
        Ok(())
    }

    fn release_lock(&self, _tid: TransactionId, _page_id: PageId) {}

    fn release_locks(&self, _tid: TransactionId) {}

    fn holds_lock(&self, _tid: TransactionId, _page_id: PageId) -> bool {
        false
    }
}
