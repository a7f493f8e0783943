//! Page identifier type.

use std::fmt;

/// Identity of a table file, shared by every page of that file
pub type TableId = u32;

/// Unique identifier for a page: the owning table plus the page's position
/// within the table file.
///
/// Page numbers are 0-indexed; page `n` occupies bytes
/// `[n * page_size, (n + 1) * page_size)` of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId {
    table_id: TableId,
    page_number: u32,
}

impl PageId {
    /// Create a new page ID
    pub const fn new(table_id: TableId, page_number: u32) -> Self {
        Self {
            table_id,
            page_number,
        }
    }

    /// Get the owning table's ID
    pub const fn table_id(self) -> TableId {
        self.table_id
    }

    /// Get the page number within the table file
    pub const fn page_number(self) -> u32 {
        self.page_number
    }

    /// Calculate the byte offset of this page in the file
    pub const fn file_offset(self, page_size: usize) -> u64 {
        self.page_number as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PAGE_SIZE;

    #[test]
    fn test_page_id_equality() {
        assert_eq!(PageId::new(7, 3), PageId::new(7, 3));
        assert_ne!(PageId::new(7, 3), PageId::new(8, 3));
        assert_ne!(PageId::new(7, 3), PageId::new(7, 4));
    }

    #[test]
    fn test_page_id_file_offset() {
        let id = PageId::new(1, 3);
        assert_eq!(id.file_offset(PAGE_SIZE), 3 * PAGE_SIZE as u64);
    }

    #[test]
    fn test_page_id_display() {
        assert_eq!(format!("{}", PageId::new(42, 5)), "42:5");
    }
}
