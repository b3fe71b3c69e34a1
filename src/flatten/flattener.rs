use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::types::{ConnectorConfig, NestingOverflow};

use super::path::{push_index, push_key};
use super::{FlatRow, SCALAR_COLUMN};

/// Walks JSON values and produces flat rows keyed by path.
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    max_depth: usize,
    overflow: NestingOverflow,
}

impl Flattener {
    pub fn new(max_depth: usize, overflow: NestingOverflow) -> Self {
        Flattener {
            max_depth,
            overflow,
        }
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::new(config.max_depth, config.nesting_overflow)
    }

    /// Flatten a document root into rows.
    ///
    /// An object yields one row; an array yields one row per element. A bare
    /// scalar root is rejected.
    pub fn flatten(&self, value: &Value, rows_out: &mut Vec<FlatRow>) -> Result<()> {
        match value {
            Value::Object(_) => rows_out.push(self.flatten_record(value)?),
            Value::Array(items) => {
                rows_out.reserve(items.len());
                for item in items {
                    rows_out.push(self.flatten_record(item)?);
                }
            }
            other => {
                return Err(Error::UnsupportedRoot {
                    found: json_type_name(other),
                })
            }
        }
        Ok(())
    }

    /// Flatten one record into one row.
    ///
    /// Objects are flattened from their own keys. Any other value is placed
    /// under the single column `value`.
    pub fn flatten_record(&self, record: &Value) -> Result<FlatRow> {
        let mut row = Map::new();
        match record {
            Value::Object(map) if map.is_empty() => {}
            Value::Object(_) => self.walk(String::new(), record, 0, &mut row)?,
            other => self.walk(SCALAR_COLUMN.to_string(), other, 1, &mut row)?,
        }
        Ok(row)
    }

    /// Depth-first walk with an explicit stack. `depth` is the depth of
    /// `start`; the record itself is depth 0.
    fn walk(&self, prefix: String, start: &Value, depth: usize, row: &mut FlatRow) -> Result<()> {
        let mut stack: Vec<(String, &Value, usize)> = vec![(prefix, start, depth)];

        while let Some((path, value, depth)) = stack.pop() {
            let is_container = match value {
                Value::Object(map) => !map.is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => false,
            };
            if !is_container {
                row.insert(path, value.clone());
                continue;
            }

            if depth >= self.max_depth {
                match self.overflow {
                    NestingOverflow::Fail => {
                        return Err(Error::StructureTooComplex {
                            path,
                            depth: depth + 1,
                            max_depth: self.max_depth,
                        });
                    }
                    NestingOverflow::Embed => {
                        row.insert(path, value.clone());
                        continue;
                    }
                }
            }

            // Children are pushed in reverse so they pop in document order.
            match value {
                Value::Object(map) => {
                    for (key, child) in map.iter().rev() {
                        stack.push((push_key(&path, key), child, depth + 1));
                    }
                }
                Value::Array(items) => {
                    for (idx, child) in items.iter().enumerate().rev() {
                        stack.push((push_index(&path, idx), child, depth + 1));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::from_config(&ConnectorConfig::default())
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
