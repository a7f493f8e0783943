//! Storage layer: table files and the catalog.
//!
//! A table is stored in one heap file of fixed-size pages. The catalog maps
//! table IDs and names to their files so the page cache can load any page
//! from its ID alone.

mod catalog;
mod db_file;
mod heap_file;
mod iterator;

pub use catalog::Catalog;
pub use db_file::{DbFile, DbFileIterator};
pub use heap_file::HeapFile;
pub use iterator::HeapFileIterator;
