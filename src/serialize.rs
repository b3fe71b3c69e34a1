//! Table-to-JSON serialization
//!
//! Every row is rebuilt into a nested object with [`unflatten`]. A table
//! with exactly one row serializes as that object; any other row count
//! serializes as an array.
//!
//! Nested columns hold canonical JSON text and are emitted as JSON strings,
//! so their original structure is not reconstructed.

use serde_json::Value;

use crate::error::Result;
use crate::flatten::unflatten;
use crate::types::Table;

/// Rebuild the JSON value for a table.
pub fn table_to_json(table: &Table) -> Result<Value> {
    let mut records = table
        .rows
        .iter()
        .map(|row| unflatten(row, &table.schema))
        .collect::<Result<Vec<Value>>>()?;

    if records.len() == 1 {
        Ok(records.remove(0))
    } else {
        Ok(Value::Array(records))
    }
}

/// Compact JSON text for a table.
pub fn serialize_table(table: &Table) -> Result<String> {
    Ok(table_to_json(table)?.to_string())
}

/// Indented JSON text for a table.
pub fn serialize_table_pretty(table: &Table) -> Result<String> {
    Ok(format!("{:#}", table_to_json(table)?))
}
