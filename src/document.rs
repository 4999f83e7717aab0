//! Document and field value types.
//!
//! A [`Document`] is an ordered set of named fields. Whether a field is
//! stored, indexed, or numeric is declared once per store by the
//! [`crate::schema::Schema`], not per document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The value carried by a document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Free text, analyzed into terms when the field is indexed.
    Text(String),
    /// A signed 64-bit integer, range-queryable when indexed.
    Numeric(i64),
}

impl FieldValue {
    /// Returns the text if this is a [`FieldValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Numeric(_) => None,
        }
    }

    /// Returns the integer if this is a [`FieldValue::Numeric`].
    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Numeric(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Numeric(v as i64)
    }
}

/// A unit of indexable content: field name → value.
///
/// Field names are unique within a document; ordering is stable (sorted by
/// name) so analysis and storage are deterministic.
///
/// # Example
///
/// ```
/// use sedum::Document;
///
/// let doc = Document::new()
///     .add_text("filename", "apache_guide.txt")
///     .add_text("content", "apache web server configuration")
///     .add_numeric("size", 1024);
/// assert_eq!(doc.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The document's fields.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Add a text field, replacing any previous value under the same name.
    pub fn add_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Text(value.into()));
        self
    }

    /// Add a numeric field, replacing any previous value under the same name.
    pub fn add_numeric(mut self, name: impl Into<String>, value: i64) -> Self {
        self.fields.insert(name.into(), FieldValue::Numeric(value));
        self
    }

    /// Get a field value by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
