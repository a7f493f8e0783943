//! Slot geometry of a heap page.

use crate::error::{Result, StorageError};
use crate::types::Schema;

/// How a page of a given size is divided between header bitmap and slots.
///
/// Each slot costs `tuple_size` bytes plus one header bit, so
/// `num_slots = floor(page_size * 8 / (tuple_size * 8 + 1))` and the header
/// takes `ceil(num_slots / 8)` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    page_size: usize,
    tuple_size: usize,
    num_slots: usize,
    header_size: usize,
}

impl PageLayout {
    /// Compute the layout for tuples of `schema` in pages of `page_size` bytes
    pub fn new(schema: &Schema, page_size: usize) -> Result<Self> {
        let tuple_size = schema.tuple_size();
        let num_slots = (page_size * 8) / (tuple_size * 8 + 1);
        if num_slots == 0 {
            return Err(StorageError::invalid_schema(format!(
                "tuple size {} does not fit in a {} byte page",
                tuple_size, page_size
            )));
        }
        Ok(Self {
            page_size,
            tuple_size,
            num_slots,
            header_size: num_slots.div_ceil(8),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Bytes used by the header bitmap
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Byte offset of the slot at `index`
    pub fn slot_offset(&self, index: usize) -> usize {
        self.header_size + index * self.tuple_size
    }

    /// Bytes occupied by header and slots; the rest of the page is padding
    #[cfg(test)]
    pub(crate) fn used_size(&self) -> usize {
        self.slot_offset(self.num_slots)
    }
}
