//! Heap page implementation.
//!
//! A heap page uses the following layout:
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Header bitmap: ceil(num_slots / 8) bytes             │
//! ├──────────────────────────────────────────────────────┤
//! │ Slot 0: tuple_size bytes                             │
//! │ Slot 1: tuple_size bytes                             │
//! │ ...                                                  │
//! │ Slot n-1: tuple_size bytes                           │
//! ├──────────────────────────────────────────────────────┤
//! │ Zero padding up to page_size                         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Empty slots are all-zero on disk. Occupied slots hold the tuple's fields
//! in schema order.

use crate::error::{Result, StorageError};
use crate::page::{HeaderBitmap, PageLayout};
use crate::types::{PageId, RecordId, Schema, TransactionId, Tuple};
use std::sync::Arc;

/// In-memory form of one page of a heap file
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    layout: PageLayout,
    header: HeaderBitmap,
    slots: Vec<Option<Tuple>>,
    dirty: bool,
    dirtier: Option<TransactionId>,
    /// Encoded image of the page before the in-progress modification
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Decode a page from its byte image.
    ///
    /// Fails with a decode error if `bytes` ends before the last slot or a
    /// stored field cannot be parsed.
    pub fn decode(
        page_id: PageId,
        schema: Arc<Schema>,
        page_size: usize,
        bytes: &[u8],
    ) -> Result<Self> {
        let layout = PageLayout::new(&schema, page_size)?;
        let header = HeaderBitmap::read(bytes, layout.num_slots()).ok_or_else(|| {
            StorageError::decode(format!(
                "page {} truncated: header needs {} bytes, got {}",
                page_id,
                layout.header_size(),
                bytes.len()
            ))
        })?;

        let mut slots = Vec::with_capacity(layout.num_slots());
        for slot in 0..layout.num_slots() {
            let start = layout.slot_offset(slot);
            let slot_bytes = bytes
                .get(start..start + layout.tuple_size())
                .ok_or_else(|| {
                    StorageError::decode(format!(
                        "page {} truncated at slot {} (offset {}, length {})",
                        page_id,
                        slot,
                        start,
                        bytes.len()
                    ))
                })?;

            if !header.is_set(slot) {
                slots.push(None);
                continue;
            }

            let mut tuple = Tuple::parse(&schema, slot_bytes)?;
            tuple.set_record_id(Some(RecordId::new(page_id, slot)));
            slots.push(Some(tuple));
        }

        let mut page = Self {
            page_id,
            schema,
            layout,
            header,
            slots,
            dirty: false,
            dirtier: None,
            before_image: Vec::new(),
        };
        page.set_before_image();
        Ok(page)
    }

    /// Create a page with every slot empty
    pub fn empty(page_id: PageId, schema: Arc<Schema>, page_size: usize) -> Result<Self> {
        Self::decode(page_id, schema, page_size, &Self::empty_page_data(page_size))
    }

    /// Byte image of an empty page
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Encode this page into exactly `page_size` bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.layout.page_size());
        self.header.write(&mut out);

        for slot in &self.slots {
            match slot {
                Some(tuple) => tuple.serialize(&mut out),
                None => out.resize(out.len() + self.layout.tuple_size(), 0),
            }
        }

        out.resize(self.layout.page_size(), 0);
        out
    }

    /// Page as it looked before the in-progress modification
    pub fn before_image(&self) -> Result<HeapPage> {
        Self::decode(
            self.page_id,
            Arc::clone(&self.schema),
            self.layout.page_size(),
            &self.before_image,
        )
    }

    /// Snapshot the current contents as the before-image
    pub fn set_before_image(&mut self) {
        self.before_image = self.encode();
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Total number of slots on this page
    pub fn num_slots(&self) -> usize {
        self.layout.num_slots()
    }

    /// Number of empty slots
    pub fn empty_slot_count(&self) -> usize {
        self.layout.num_slots() - self.header.used()
    }

    /// Check whether slot `index` holds a tuple
    pub fn is_slot_used(&self, index: usize) -> bool {
        self.header.is_set(index)
    }

    /// Tuple stored in slot `index`, if any
    pub fn tuple(&self, index: usize) -> Option<&Tuple> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Store `tuple` in the lowest-indexed empty slot.
    ///
    /// On success `tuple` carries its new record ID.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<RecordId> {
        if tuple.schema().as_ref() != self.schema.as_ref() {
            return Err(StorageError::SchemaMismatch);
        }

        let slot = self.header.first_empty().ok_or(StorageError::PageFull {
            page_id: self.page_id,
        })?;

        let record_id = RecordId::new(self.page_id, slot);
        tuple.set_record_id(Some(record_id));
        self.slots[slot] = Some(tuple.clone());
        self.header.set(slot, true);
        Ok(record_id)
    }

    /// Remove a stored tuple equal to `tuple` and clear its record ID.
    ///
    /// The slot named by `tuple`'s record ID is tried first; otherwise the
    /// lowest-indexed equal tuple is removed.
    pub fn delete_tuple(&mut self, tuple: &mut Tuple) -> Result<()> {
        let hinted = tuple
            .record_id()
            .filter(|rid| rid.page_id() == self.page_id)
            .map(|rid| rid.slot())
            .filter(|&slot| self.tuple(slot) == Some(&*tuple));

        let slot = match hinted {
            Some(slot) => slot,
            None => (0..self.num_slots())
                .find(|&slot| self.tuple(slot) == Some(&*tuple))
                .ok_or(StorageError::TupleNotFound)?,
        };

        self.slots[slot] = None;
        self.header.set(slot, false);
        tuple.set_record_id(None);
        Ok(())
    }

    /// Mark this page dirty or clean on behalf of a transaction.
    ///
    /// The clean -> dirty transition snapshots the before-image.
    pub fn mark_dirty(&mut self, dirty: bool, tid: Option<TransactionId>) {
        if dirty {
            if !self.dirty {
                self.set_before_image();
            }
            self.dirty = true;
            self.dirtier = tid;
        } else {
            self.dirty = false;
            self.dirtier = None;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Transaction that last dirtied this page, if it is dirty
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Occupied slots' tuples in increasing slot order
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Popcount of the header bitmap
    pub fn header_popcount(&self) -> usize {
        self.header.count_ones()
    }
}
