//! Tuples: field values bound to a schema.

use crate::error::{Result, StorageError};
use crate::types::{Field, FieldType, RecordId, Schema};
use std::fmt;
use std::sync::Arc;

/// A row of field values laid out according to a schema.
///
/// Every stored value matches the declared type at its position. A tuple
/// that resides in a page slot carries a [`RecordId`]; free-standing tuples
/// carry none.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Arc<Schema>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Create a tuple from a full list of values
    pub fn new(schema: Arc<Schema>, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != schema.num_fields() {
            return Err(StorageError::FieldIndexOutOfBounds {
                index: fields.len(),
                count: schema.num_fields(),
            });
        }
        for (i, field) in fields.iter().enumerate() {
            field.check(i, schema.field_type(i)?)?;
        }
        Ok(Self {
            schema,
            fields,
            record_id: None,
        })
    }

    /// Get the schema this tuple is bound to
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Get the value at `index`
    pub fn field(&self, index: usize) -> Result<&Field> {
        self.fields
            .get(index)
            .ok_or(StorageError::FieldIndexOutOfBounds {
                index,
                count: self.fields.len(),
            })
    }

    /// Replace the value at `index`, checking it against the schema
    pub fn set_field(&mut self, index: usize, field: Field) -> Result<()> {
        let field_type = self.schema.field_type(index)?;
        field.check(index, field_type)?;
        self.fields[index] = field;
        Ok(())
    }

    /// Iterate over the values in schema order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Location of this tuple, if it is stored in a page
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Rebind to another schema with default values (0 / empty text)
    pub fn reset_schema(&mut self, schema: Arc<Schema>) {
        self.fields = schema
            .iter()
            .map(|item| match item.field_type {
                FieldType::Int => Field::Int(0),
                FieldType::Text(_) => Field::Text(String::new()),
            })
            .collect();
        self.schema = schema;
        self.record_id = None;
    }

    /// Append the fixed-width encoding of every field to `out`
    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        for (item, field) in self.schema.iter().zip(&self.fields) {
            field.serialize(item.field_type, out);
        }
    }

    /// Decode a tuple of `schema` from the front of `bytes`
    pub(crate) fn parse(schema: &Arc<Schema>, bytes: &[u8]) -> Result<Self> {
        let mut fields = Vec::with_capacity(schema.num_fields());
        let mut offset = 0;
        for item in schema.iter() {
            let rest = bytes.get(offset..).unwrap_or(&[]);
            fields.push(item.field_type.parse(rest)?);
            offset += item.field_type.size();
        }
        Ok(Self {
            schema: Arc::clone(schema),
            fields,
            record_id: None,
        })
    }
}

/// Tuples are equal when their schemas and values are equal; the record
/// locator is not compared.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
