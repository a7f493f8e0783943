//! Page layer: heap page format with a slot occupancy bitmap.
//!
//! This module implements the on-disk page structure of a heap file.
//! Pages are fixed-size arrays of equally sized tuple slots where:
//! - A header bitmap records which slots are occupied
//! - Slots follow the header in index order
//! - The remainder of the page is zero padding

mod header;
mod heap_page;
mod layout;

pub use header::HeaderBitmap;
pub use heap_page::HeapPage;
pub use layout::PageLayout;
