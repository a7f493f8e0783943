//! Record locator type.

use crate::types::PageId;
use std::fmt;

/// Location of a tuple that currently resides in a page slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    page_id: PageId,
    slot: usize,
}

impl RecordId {
    /// Create a new record ID
    pub const fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }

    /// Page holding the tuple
    pub const fn page_id(self) -> PageId {
        self.page_id
    }

    /// Slot index within the page
    pub const fn slot(self) -> usize {
        self.slot
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page_id, self.slot)
    }
}
