//! Schema descriptor for tuples.

use crate::error::{Result, StorageError};
use crate::types::{FieldType, TEXT_LEN_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One named (or anonymous) field of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

impl SchemaItem {
    pub fn new(field_type: FieldType, name: impl Into<String>) -> Self {
        Self {
            field_type,
            name: Some(name.into()),
        }
    }

    pub fn anonymous(field_type: FieldType) -> Self {
        Self {
            field_type,
            name: None,
        }
    }
}

impl fmt::Display for SchemaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.field_type, self.name.as_deref().unwrap_or(""))
    }
}

/// Ordered list of field types with a precomputed tuple size.
///
/// Two schemas are equal when they have the same number of fields and the
/// same type at every position; field names are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<SchemaItem>", into = "Vec<SchemaItem>")]
pub struct Schema {
    items: Vec<SchemaItem>,
    tuple_size: usize,
}

impl Schema {
    /// Create a schema from its fields.
    ///
    /// Fails if there are no fields or if a text field is too narrow to hold
    /// its length prefix.
    pub fn new(items: Vec<SchemaItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(StorageError::invalid_schema("schema needs at least one field"));
        }
        for item in &items {
            if let FieldType::Text(width) = item.field_type {
                if width <= TEXT_LEN_PREFIX {
                    return Err(StorageError::invalid_schema(format!(
                        "text field width {} must exceed {} bytes",
                        width, TEXT_LEN_PREFIX
                    )));
                }
            }
        }
        let tuple_size = items.iter().map(|item| item.field_type.size()).sum();
        Ok(Self { items, tuple_size })
    }

    /// Create a schema of named fields
    pub fn named<S: Into<String>>(fields: impl IntoIterator<Item = (FieldType, S)>) -> Result<Self> {
        Self::new(
            fields
                .into_iter()
                .map(|(field_type, name)| SchemaItem::new(field_type, name))
                .collect(),
        )
    }

    /// Create a schema of anonymous fields
    pub fn anonymous(types: impl IntoIterator<Item = FieldType>) -> Result<Self> {
        Self::new(types.into_iter().map(SchemaItem::anonymous).collect())
    }

    /// Concatenate two schemas, `first`'s fields before `second`'s
    pub fn merge(first: &Schema, second: &Schema) -> Schema {
        let items: Vec<SchemaItem> = first.items.iter().chain(&second.items).cloned().collect();
        Schema {
            tuple_size: first.tuple_size + second.tuple_size,
            items,
        }
    }

    /// Number of fields
    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    /// Byte size of one tuple of this schema
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Type of the field at `index`
    pub fn field_type(&self, index: usize) -> Result<FieldType> {
        self.item(index).map(|item| item.field_type)
    }

    /// Name of the field at `index` (None for anonymous fields)
    pub fn field_name(&self, index: usize) -> Result<Option<&str>> {
        self.item(index).map(|item| item.name.as_deref())
    }

    /// Index of the first field with the given name
    pub fn field_name_to_index(&self, name: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
            .ok_or_else(|| StorageError::FieldNotFound(name.to_owned()))
    }

    /// Iterate over the fields in order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaItem> {
        self.items.iter()
    }

    fn item(&self, index: usize) -> Result<&SchemaItem> {
        self.items
            .get(index)
            .ok_or(StorageError::FieldIndexOutOfBounds {
                index,
                count: self.items.len(),
            })
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

impl TryFrom<Vec<SchemaItem>> for Schema {
    type Error = StorageError;

    fn try_from(items: Vec<SchemaItem>) -> Result<Self> {
        Self::new(items)
    }
}

impl From<Schema> for Vec<SchemaItem> {
    fn from(schema: Schema) -> Self {
        schema.items
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
