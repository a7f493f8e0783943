//! Common types used throughout the storage engine.

mod field;
mod page_id;
mod record_id;
mod schema;
mod transaction;
mod tuple;

pub use field::{Field, FieldType, DEFAULT_TEXT_WIDTH, TEXT_LEN_PREFIX};
pub use page_id::{PageId, TableId};
pub use record_id::RecordId;
pub use schema::{Schema, SchemaItem};
pub use transaction::{Permissions, TransactionId};
pub use tuple::Tuple;

/// Default page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages held by the page cache
pub const DEFAULT_CACHE_PAGES: usize = 50;
