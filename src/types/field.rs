//! Field types and field values.
//!
//! Every field has a fixed on-disk width so that tuples of one schema all
//! occupy the same number of bytes:
//!
//! ```text
//! Int        4 bytes   big-endian two's complement
//! Text(n)    n bytes   [len: u32 BE][len UTF-8 bytes][zero padding]
//! ```

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the length prefix in front of text payloads
pub const TEXT_LEN_PREFIX: usize = 4;

/// Default on-disk width of a text field (128 payload bytes)
pub const DEFAULT_TEXT_WIDTH: usize = 128 + TEXT_LEN_PREFIX;

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    /// 32-bit signed integer
    Int,
    /// Bounded string; the value is the total on-disk width in bytes
    Text(usize),
}

impl FieldType {
    /// Text field with the default width
    pub const fn text() -> Self {
        Self::Text(DEFAULT_TEXT_WIDTH)
    }

    /// On-disk width of this field in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Int => 4,
            Self::Text(width) => width,
        }
    }

    /// Maximum payload length for text fields
    pub const fn max_text_len(self) -> usize {
        match self {
            Self::Int => 0,
            Self::Text(width) => width.saturating_sub(TEXT_LEN_PREFIX),
        }
    }

    /// Decode one value of this type from the front of `bytes`
    pub fn parse(self, bytes: &[u8]) -> Result<Field> {
        let width = self.size();
        if bytes.len() < width {
            return Err(StorageError::decode(format!(
                "field needs {} bytes, only {} available",
                width,
                bytes.len()
            )));
        }

        match self {
            Self::Int => Ok(Field::Int(i32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            Self::Text(width) if width < TEXT_LEN_PREFIX => Err(StorageError::decode(format!(
                "text width {} cannot hold a length prefix",
                width
            ))),
            Self::Text(_) => {
                let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
                if len > self.max_text_len() {
                    return Err(StorageError::decode(format!(
                        "text length {} exceeds field capacity {}",
                        len,
                        self.max_text_len()
                    )));
                }
                let payload = &bytes[TEXT_LEN_PREFIX..TEXT_LEN_PREFIX + len];
                let text = std::str::from_utf8(payload)
                    .map_err(|e| StorageError::decode(format!("invalid UTF-8 in text field: {}", e)))?;
                Ok(Field::Text(text.to_owned()))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "INT"),
            Self::Text(width) => write!(f, "TEXT({})", width),
        }
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// Short name of the value kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Text(_) => "text",
        }
    }

    /// Check that this value can be stored at position `index` in a field
    /// of `field_type`
    pub fn check(&self, index: usize, field_type: FieldType) -> Result<()> {
        match (self, field_type) {
            (Self::Int(_), FieldType::Int) => Ok(()),
            (Self::Text(s), FieldType::Text(_)) => {
                let max = field_type.max_text_len();
                if s.len() > max {
                    Err(StorageError::ValueTooLarge { size: s.len(), max })
                } else {
                    Ok(())
                }
            }
            _ => Err(StorageError::TypeMismatch {
                index,
                expected: field_type,
                found: self.kind(),
            }),
        }
    }

    /// Append the fixed-width encoding of this value to `out`.
    ///
    /// Exactly `field_type.size()` bytes are written. Callers guarantee the
    /// value was validated with [`Field::check`].
    pub fn serialize(&self, field_type: FieldType, out: &mut Vec<u8>) {
        debug_assert!(
            self.check(0, field_type).is_ok(),
            "{} value serialized as {}",
            self.kind(),
            field_type
        );
        let start = out.len();
        match (self, field_type) {
            (Self::Int(v), FieldType::Int) => out.extend_from_slice(&v.to_be_bytes()),
            (Self::Text(s), FieldType::Text(_)) => {
                let payload = &s.as_bytes()[..s.len().min(field_type.max_text_len())];
                out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                out.extend_from_slice(payload);
            }
            _ => {}
        }
        out.resize(start + field_type.size(), 0);
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
