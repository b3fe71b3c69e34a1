//! Rebuild nested JSON from flat path names.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::Row;

use super::path::{parse_path_bounded, PathSegment};
use super::FlatRow;

/// Rebuild a nested object from a row and its schema.
///
/// Nested-typed columns come back as JSON strings holding their canonical
/// text; the original structure is not re-embedded.
pub fn unflatten(row: &Row, schema: &Schema) -> Result<Value> {
    if row.len() != schema.len() {
        return Err(Error::InvalidArgument(format!(
            "row has {} cells but schema has {} columns",
            row.len(),
            schema.len()
        )));
    }
    let entries = schema
        .columns()
        .iter()
        .zip(row.cells())
        .map(|(column, cell)| (column.name.as_str(), cell.to_json()));
    Ok(build(entries))
}

/// Rebuild a nested object from a flat path → value map.
pub fn unflatten_map(row: &FlatRow) -> Value {
    build(row.iter().map(|(path, value)| (path.as_str(), value.clone())))
}

/// Array positions below this are always honoured, so gapped indices still
/// rebuild arrays in small rows.
const MIN_INDEX_LIMIT: usize = 1024;

fn build<'a, I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let entries: Vec<(&str, Value)> = entries.into_iter().collect();
    // A flattened array of n elements yields at least n columns, so an index
    // beyond the column count can only be literal key text.
    let index_limit = entries.len().max(MIN_INDEX_LIMIT);

    let mut root = Value::Object(Map::new());
    let mut deferred_nulls = Vec::new();

    // Non-null values shape the tree first so a null column can never
    // replace structure built by a sibling path.
    for (path, value) in entries {
        if value.is_null() {
            deferred_nulls.push(path);
        } else {
            insert(&mut root, &segments_of(path, index_limit), value);
        }
    }
    for path in deferred_nulls {
        insert(&mut root, &segments_of(path, index_limit), Value::Null);
    }
    root
}

fn segments_of(path: &str, index_limit: usize) -> Vec<PathSegment> {
    let segments = parse_path_bounded(path, index_limit);
    match segments.first() {
        // The row itself is always an object; a leading index cannot apply to it.
        Some(PathSegment::Index(_)) | None => vec![PathSegment::Key(path.to_string())],
        Some(PathSegment::Key(_)) => segments,
    }
}

fn insert(root: &mut Value, segments: &[PathSegment], value: Value) {
    let placing_null = value.is_null();
    let mut node = root;

    for segment in segments {
        if placing_null && !is_container(node) && !node.is_null() {
            return;
        }
        node = match segment {
            PathSegment::Key(key) => {
                if !node.is_object() {
                    *node = Value::Object(Map::new());
                }
                let Value::Object(map) = node else {
                    unreachable!("node was just made an object")
                };
                map.entry(key.clone()).or_insert(Value::Null)
            }
            PathSegment::Index(idx) => {
                if !node.is_array() {
                    *node = Value::Array(Vec::new());
                }
                let Value::Array(items) = node else {
                    unreachable!("node was just made an array")
                };
                if items.len() <= *idx {
                    items.resize(*idx + 1, Value::Null);
                }
                &mut items[*idx]
            }
        };
    }

    if placing_null && !node.is_null() {
        return;
    }
    *node = value;
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}
