//! Widening schema builder with a streaming accumulator pattern
//!
//! Rows are folded into per-column accumulators as they arrive and the
//! schema is produced once at the end, so a later row can widen a column
//! that earlier rows had narrowed.

use std::collections::HashMap;

use crate::flatten::FlatRow;

use super::inference::TypeAccumulator;
use super::{Column, Schema};

/// Accumulates flattened rows into an ordered, typed column list.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    columns: Vec<(String, TypeAccumulator)>,
    index: HashMap<String, usize>,
    row_count: usize,
    detect_formats: bool,
}

impl SchemaBuilder {
    /// Create a new empty schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Also annotate String columns with a detected [`super::StringFormat`].
    pub fn with_format_detection(mut self, detect: bool) -> Self {
        self.detect_formats = detect;
        self
    }

    fn accumulator(&mut self, name: &str) -> &mut TypeAccumulator {
        let idx = match self.index.get(name) {
            Some(idx) => *idx,
            None => {
                let idx = self.columns.len();
                self.index.insert(name.to_string(), idx);
                self.columns
                    .push((name.to_string(), TypeAccumulator::new(self.detect_formats)));
                idx
            }
        };
        &mut self.columns[idx].1
    }

    /// Add one flattened row. New paths are appended in first-seen order.
    pub fn add_row(&mut self, row: &FlatRow) {
        self.row_count += 1;
        for (path, value) in row {
            self.accumulator(path).observe(value);
        }
    }

    pub fn add_rows<'a, I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = &'a FlatRow>,
    {
        for row in rows {
            self.add_row(row);
        }
    }

    /// Fold the evidence of another builder into this one.
    ///
    /// Columns unknown to `self` are appended after its own, in `other`'s
    /// order. A column that one side never saw becomes nullable.
    pub fn merge(&mut self, other: &SchemaBuilder) {
        for (name, acc) in &other.columns {
            self.accumulator(name).merge(acc);
        }
        self.row_count += other.row_count;
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build the schema from accumulated statistics
    pub fn build(&self) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|(name, acc)| {
                let nullable = acc.saw_null() || acc.samples() < self.row_count;
                let mut column = Column::new(name.clone(), acc.type_tag(), nullable);
                column.format = acc.format();
                column
            })
            .collect();
        Schema::new(columns)
    }
}

/// Infer a widened schema over a set of flattened rows.
pub fn infer_table_schema(rows: &[FlatRow], detect_formats: bool) -> Schema {
    let mut builder = SchemaBuilder::new().with_format_detection(detect_formats);
    builder.add_rows(rows);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{StringFormat, TypeTag};
    use serde_json::json;

    fn row(value: serde_json::Value) -> FlatRow {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_empty_builder() {
        let builder = SchemaBuilder::new();
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_union_in_first_seen_order() {
        let rows = vec![
            row(json!({"a": 1, "b": "x"})),
            row(json!({"c": true, "a": 2})),
        ];
        let schema = infer_table_schema(&rows, false);
        let names: Vec<&str> = schema.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_column_is_nullable() {
        let rows = vec![row(json!({"a": 1, "b": "x"})), row(json!({"a": 2}))];
        let schema = infer_table_schema(&rows, false);

        assert_eq!(schema.columns()[0], Column::new("a", TypeTag::Integer, false));
        assert_eq!(schema.columns()[1], Column::new("b", TypeTag::String, true));
    }

    #[test]
    fn test_later_row_widens() {
        let rows = vec![
            row(json!({"n": 1})),
            row(json!({"n": 2.5})),
            row(json!({"n": 3})),
        ];
        let schema = infer_table_schema(&rows, false);
        assert_eq!(schema.column("n").unwrap().type_tag, TypeTag::Float);

        let rows = vec![row(json!({"n": 1})), row(json!({"n": "three"}))];
        let schema = infer_table_schema(&rows, false);
        assert_eq!(schema.column("n").unwrap().type_tag, TypeTag::String);
    }

    #[test]
    fn test_null_only_column_widens_on_later_evidence() {
        let rows = vec![row(json!({"v": null})), row(json!({"v": 7}))];
        let schema = infer_table_schema(&rows, false);
        assert_eq!(schema.column("v").unwrap(), &Column::new("v", TypeTag::Integer, true));
    }

    #[test]
    fn test_merge_builders() {
        let mut left = SchemaBuilder::new();
        left.add_row(&row(json!({"id": 1, "name": "a"})));

        let mut right = SchemaBuilder::new();
        right.add_row(&row(json!({"id": 2.5, "tags[0]": "x"})));

        left.merge(&right);
        let schema = left.build();

        assert_eq!(left.row_count(), 2);
        assert_eq!(schema.column("id").unwrap(), &Column::new("id", TypeTag::Float, false));
        assert!(schema.column("name").unwrap().nullable);
        assert!(schema.column("tags[0]").unwrap().nullable);
        assert_eq!(schema.index_of("tags[0]"), Some(2));
    }

    #[test]
    fn test_format_detection() {
        let rows = vec![
            row(json!({"email": "alice@example.com"})),
            row(json!({"email": "bob@example.org"})),
        ];
        let schema = infer_table_schema(&rows, true);
        assert_eq!(schema.column("email").unwrap().format, Some(StringFormat::Email));
    }
}
