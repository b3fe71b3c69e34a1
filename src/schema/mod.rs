//! Column schemas for flattened JSON
//!
//! Two resolution strategies live here. [`SchemaBuilder`] widens column types
//! as evidence accumulates (whole-document loads), while [`FrozenSchema`] is
//! fixed from the first streamed batch and coerces everything after it.

pub mod builder;
pub mod coerce;
pub mod frozen;
pub mod inference;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use builder::{infer_table_schema, SchemaBuilder};
pub use coerce::{canonical_json, coerce_value, conform_row, Conformed};
pub use frozen::FrozenSchema;
pub use inference::{infer_type, StringFormat, TypeAccumulator};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Integer,
    Float,
    Boolean,
    String,
    /// Structurally complex values stored as canonical JSON text.
    Nested,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::Nested => "nested",
        }
    }

    /// Narrowest type that can hold values of both `self` and `other`.
    pub fn widen(self, other: TypeTag) -> TypeTag {
        match (self, other) {
            (a, b) if a == b => a,
            (TypeTag::Nested, _) | (_, TypeTag::Nested) => TypeTag::Nested,
            (TypeTag::Integer, TypeTag::Float) | (TypeTag::Float, TypeTag::Integer) => {
                TypeTag::Float
            }
            _ => TypeTag::String,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed column, named by its flat path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_tag: TypeTag, nullable: bool) -> Self {
        Column {
            name: name.into(),
            type_tag,
            nullable,
            format: None,
        }
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Ordered, name-unique list of columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Column>", into = "Vec<Column>")]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema from columns. A repeated name keeps its first position.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut schema = Schema::default();
        for column in columns {
            schema.push(column);
        }
        schema
    }

    fn push(&mut self, column: Column) {
        if self.index.contains_key(&column.name) {
            return;
        }
        self.index.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|idx| &self.columns[idx])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl From<Vec<Column>> for Schema {
    fn from(columns: Vec<Column>) -> Self {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<Column> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", column.name, column.type_tag)?;
            if column.nullable {
                f.write_str("?")?;
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen_lattice() {
        assert_eq!(TypeTag::Integer.widen(TypeTag::Integer), TypeTag::Integer);
        assert_eq!(TypeTag::Integer.widen(TypeTag::Float), TypeTag::Float);
        assert_eq!(TypeTag::Float.widen(TypeTag::Integer), TypeTag::Float);
        assert_eq!(TypeTag::Boolean.widen(TypeTag::Integer), TypeTag::String);
        assert_eq!(TypeTag::Float.widen(TypeTag::String), TypeTag::String);
        assert_eq!(TypeTag::String.widen(TypeTag::Nested), TypeTag::Nested);
    }

    #[test]
    fn test_schema_keeps_first_duplicate() {
        let schema = Schema::new(vec![
            Column::new("a", TypeTag::Integer, false),
            Column::new("b", TypeTag::String, true),
            Column::new("a", TypeTag::Float, true),
        ]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.column("a").unwrap().type_tag, TypeTag::Integer);
        assert_eq!(schema.index_of("b"), Some(1));
    }

    #[test]
    fn test_schema_serde_roundtrip_rebuilds_index() {
        let schema = Schema::new(vec![
            Column::new("id", TypeTag::Integer, false),
            Column::new("email", TypeTag::String, true).with_format(StringFormat::Email),
        ]);

        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.starts_with('['));
        assert!(text.contains("\"type\":\"integer\""));
        assert!(text.contains("\"format\":\"email\""));

        let back: Schema = serde_json::from_str(&text).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.index_of("email"), Some(1));
    }

    #[test]
    fn test_schema_display() {
        let schema = Schema::new(vec![
            Column::new("a", TypeTag::Integer, false),
            Column::new("b", TypeTag::String, true),
        ]);
        assert_eq!(schema.to_string(), "[a:integer, b:string?]");
    }
}
