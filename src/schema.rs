//! Per-store field schema.
//!
//! Every field name used by an index is declared once, up front, with an
//! explicit type and store/index flags. [`Schema::validate`] rejects
//! documents that use undeclared fields or mismatched value types, so the
//! same field name can never hold text in one document and a number in
//! another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{Document, FieldValue};
use crate::error::{Result, SedumError};

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Analyzed text, term-queryable when indexed.
    Text,
    /// Signed 64-bit integer, term- and range-queryable when indexed.
    Numeric,
    /// Stored verbatim, never indexed.
    Stored,
}

/// How a single field is handled by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Declared value type.
    pub field_type: FieldType,
    /// Whether the raw value is kept for retrieval via fetch.
    pub stored: bool,
    /// Whether the value participates in the inverted index.
    pub indexed: bool,
}

impl FieldOptions {
    /// Indexed and stored text.
    pub fn text() -> Self {
        FieldOptions {
            field_type: FieldType::Text,
            stored: true,
            indexed: true,
        }
    }

    /// Indexed text that is not kept for retrieval.
    pub fn text_not_stored() -> Self {
        FieldOptions {
            field_type: FieldType::Text,
            stored: false,
            indexed: true,
        }
    }

    /// Indexed and stored numeric value.
    pub fn numeric() -> Self {
        FieldOptions {
            field_type: FieldType::Numeric,
            stored: true,
            indexed: true,
        }
    }

    /// Stored-only payload, invisible to queries.
    pub fn stored_only() -> Self {
        FieldOptions {
            field_type: FieldType::Stored,
            stored: true,
            indexed: false,
        }
    }
}

/// The full field schema for one store.
///
/// # Example
///
/// ```
/// use sedum::schema::Schema;
///
/// let schema = Schema::builder()
///     .add_text_field("filename")
///     .add_text_field_not_stored("content")
///     .add_stored_field("path")
///     .add_numeric_field("size")
///     .default_field("filename")
///     .build();
/// assert!(schema.field("size").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: BTreeMap<String, FieldOptions>,
    #[serde(default)]
    default_field: Option<String>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up the options for a field name.
    pub fn field(&self, name: &str) -> Option<&FieldOptions> {
        self.fields.get(name)
    }

    /// Iterate over all declared fields.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldOptions)> {
        self.fields.iter().map(|(name, opts)| (name.as_str(), opts))
    }

    /// The field used by the query parser when a clause has no field prefix.
    pub fn default_field(&self) -> Option<&str> {
        self.default_field.as_deref()
    }

    /// Check a document against this schema.
    ///
    /// Undeclared field names and type mismatches are rejected with
    /// [`SedumError::SchemaViolation`].
    pub fn validate(&self, doc: &Document) -> Result<()> {
        for (name, value) in &doc.fields {
            let options = self.fields.get(name).ok_or_else(|| {
                SedumError::schema(format!("field '{name}' is not declared in the schema"))
            })?;
            match (options.field_type, value) {
                (FieldType::Text, FieldValue::Text(_)) => {}
                (FieldType::Stored, FieldValue::Text(_)) => {}
                (FieldType::Stored, FieldValue::Numeric(_)) => {}
                (FieldType::Numeric, FieldValue::Numeric(_)) => {}
                (FieldType::Numeric, FieldValue::Text(_)) => {
                    return Err(SedumError::schema(format!(
                        "field '{name}' is declared numeric but holds text"
                    )));
                }
                (FieldType::Text, FieldValue::Numeric(_)) => {
                    return Err(SedumError::schema(format!(
                        "field '{name}' is declared text but holds a number"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, FieldOptions>,
    default_field: Option<String>,
}

impl SchemaBuilder {
    /// Declare a field with explicit options.
    pub fn add_field(mut self, name: impl Into<String>, options: FieldOptions) -> Self {
        self.fields.insert(name.into(), options);
        self
    }

    /// Declare an indexed, stored text field.
    pub fn add_text_field(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldOptions::text())
    }

    /// Declare an indexed text field that is not stored.
    pub fn add_text_field_not_stored(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldOptions::text_not_stored())
    }

    /// Declare an indexed, stored numeric field.
    pub fn add_numeric_field(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldOptions::numeric())
    }

    /// Declare a stored-only field.
    pub fn add_stored_field(self, name: impl Into<String>) -> Self {
        self.add_field(name, FieldOptions::stored_only())
    }

    /// Set the default search field for the query parser.
    pub fn default_field(mut self, name: impl Into<String>) -> Self {
        self.default_field = Some(name.into());
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
            default_field: self.default_field,
        }
    }
}
