//! # jsontable - JSON to table and back
//!
//! Loads JSON documents into typed tables and serializes tables back to
//! nested JSON.
//!
//! ## Modules
//!
//! - **decode**: whole-document and incremental root-array decoding
//! - **flatten**: path-keyed flattening (`address.city`, `items[0].sku`) and its inverse
//! - **schema**: column type inference, widening and frozen schemas
//! - **melt**: streaming a root array into batches for a sink
//! - **connector**: the configured entry point tying these together
//!
//! ## Quick Start
//!
//! ### Whole-document load
//!
//! ```rust
//! use jsontable::{ConnectorConfig, JsonConnector, Source, TypeTag};
//!
//! # fn main() -> jsontable::Result<()> {
//! let connector = JsonConnector::new(ConnectorConfig::default())?;
//! let table = connector.get_data(Source::from_bytes(r#"[{"a": 1, "b": "x"}, {"a": 2}]"#))?;
//!
//! assert_eq!(table.num_rows(), 2);
//! assert_eq!(table.schema.column("a").unwrap().type_tag, TypeTag::Integer);
//! assert!(table.schema.column("b").unwrap().nullable);
//! # Ok(())
//! # }
//! ```
//!
//! ### Streaming into batches
//!
//! ```rust
//! use jsontable::{ConnectorConfig, JsonConnector, MemorySink, Source};
//!
//! # fn main() -> jsontable::Result<()> {
//! let connector = JsonConnector::new(ConnectorConfig::default())?;
//! let source = Source::from_bytes(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);
//! let load = connector.get_storage_data(source, MemorySink::new(), 2)?;
//!
//! assert_eq!(load.summary.batches, 2);
//! assert_eq!(load.sink.into_table().num_rows(), 3);
//! # Ok(())
//! # }
//! ```

pub mod connector;
pub mod decode;
pub mod error;
pub mod flatten;
pub mod melt;
pub mod schema;
pub mod serialize;
pub mod source;
pub mod types;

// Re-export commonly used types for convenience
pub use connector::{JsonConnector, CONNECTOR_ID};
pub use error::{Error, ParseError, Result};
pub use flatten::{unflatten, FlatRow, Flattener};
pub use melt::{BatchSink, JsonLinesSink, MemorySink, StorageLoad, StreamStatus, StreamSummary};
pub use schema::{Column, FrozenSchema, Schema, SchemaBuilder, StringFormat, TypeTag};
pub use serialize::{serialize_table, table_to_json};
pub use source::Source;
pub use types::{Batch, CancelToken, Cell, ConnectorConfig, NestingOverflow, Row, Table};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_and_serialize_roundtrip() {
        let input = json!({
            "id": 1,
            "name": "Alice",
            "address": {"city": "Oslo", "zip": "0150"},
            "tags": ["admin", "ops"]
        });

        let connector = JsonConnector::new(ConnectorConfig::default()).unwrap();
        let table = connector.table_from_value(&input).unwrap();
        assert_eq!(table.num_rows(), 1);

        let text = connector.serialize(&table).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, input);
    }
}
