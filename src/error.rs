//! Error types for the storage engine.

use crate::types::{FieldType, PageId, TableId};
use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tuple schema does not match the page or file schema
    #[error("Schema mismatch: tuple schema differs from table schema")]
    SchemaMismatch,

    /// Page has no empty slot left
    #[error("Page {page_id} is full")]
    PageFull { page_id: PageId },

    /// Delete target is not stored on the page or file
    #[error("Tuple not found")]
    TupleNotFound,

    /// Eviction was needed but every resident page is dirty or in use
    #[error("Page cache exhausted: every resident page is dirty")]
    PoolExhausted,

    /// Truncated or malformed page image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Field value kind does not match the declared field type
    #[error("Type mismatch at field {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: FieldType,
        found: &'static str,
    },

    /// Text value exceeds the capacity of its field
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// Field index outside the schema
    #[error("Field index {index} out of bounds (count: {count})")]
    FieldIndexOutOfBounds { index: usize, count: usize },

    /// No field carries the requested name
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Catalog has no table under this id or name
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Iterator has no more tuples
    #[error("No more elements")]
    NoSuchElement,

    /// Schema cannot be used to lay out pages
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid operation for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration could not be parsed or is out of range
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StorageError {
    /// Create a decode error with a message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid schema error
    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Table lookup failed for a numeric id
    pub fn table_not_found(table_id: TableId) -> Self {
        Self::TableNotFound(table_id.to_string())
    }
}
