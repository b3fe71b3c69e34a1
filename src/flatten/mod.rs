//! Flattening nested JSON into path-keyed rows, and back
//!
//! Objects compose paths with `.` and arrays with `[index]`, so
//! `{"items": [{"sku": "X"}]}` becomes the single column `items[0].sku`.
//! Empty objects and arrays stay as leaves and end up in Nested columns.

pub mod flattener;
pub mod path;
pub mod unflatten;

use serde_json::{Map, Value};

pub use flattener::Flattener;
pub use path::{parse_path, parse_path_bounded, PathSegment};
pub use unflatten::{unflatten, unflatten_map};

/// Path-keyed leaf values of one record, in document order.
pub type FlatRow = Map<String, Value>;

/// Column name used for records that are not objects.
pub const SCALAR_COLUMN: &str = "value";
