use crate::error::Result;
use crate::flatten::FlatRow;

use super::builder::SchemaBuilder;
use super::coerce::{conform_row, Conformed};
use super::Schema;

/// Schema fixed from the first streamed batch.
///
/// Unlike [`SchemaBuilder`], nothing seen afterwards changes it: unknown paths
/// are dropped and conflicting values are coerced to the frozen column type.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenSchema {
    schema: Schema,
}

impl FrozenSchema {
    /// Infer the schema from exactly the rows of the first batch.
    pub fn from_first_batch(rows: &[FlatRow], detect_formats: bool) -> Self {
        let mut builder = SchemaBuilder::new().with_format_detection(detect_formats);
        builder.add_rows(rows);
        FrozenSchema {
            schema: builder.build(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    pub fn conform(&self, row: &FlatRow, strict: bool) -> Result<Conformed> {
        conform_row(row, &self.schema, strict)
    }
}

impl From<Schema> for FrozenSchema {
    fn from(schema: Schema) -> Self {
        FrozenSchema { schema }
    }
}
