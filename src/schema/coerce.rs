//! Value-to-cell coercion against a resolved column type.

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::flatten::FlatRow;
use crate::types::{Cell, Row};

use super::{Schema, TypeTag};

/// Compact JSON text with object keys sorted, so equal values always
/// produce equal text.
pub fn canonical_json(value: &Value) -> String {
    fn sorted(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = Map::with_capacity(map.len());
                for key in keys {
                    out.insert(key.clone(), sorted(&map[key.as_str()]));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
            other => other.clone(),
        }
    }
    sorted(value).to_string()
}

/// String form of a value used for best-effort conversion.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => canonical_json(value),
        other => other.to_string(),
    }
}

/// `f` as an i64 when it has no fractional part and is in range.
pub(crate) fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Some(i);
    }
    integral(text.parse::<f64>().ok()?)
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Convert `value` to a cell of type `tag`.
///
/// Values of the matching kind convert directly; anything else goes through
/// its string form. Returns `None` when even that cannot produce the target
/// type. String and Nested targets always succeed.
pub fn coerce_value(value: &Value, tag: TypeTag) -> Option<Cell> {
    if value.is_null() {
        return Some(Cell::Null);
    }
    match tag {
        TypeTag::Nested => Some(Cell::String(canonical_json(value))),
        TypeTag::String => Some(Cell::String(text_of(value))),
        TypeTag::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Cell::Integer),
            Value::String(s) => parse_integer(s).map(Cell::Integer),
            _ => None,
        },
        TypeTag::Float => match value {
            Value::Number(n) => n.as_f64().map(Cell::Float),
            Value::String(s) => parse_float(s).map(Cell::Float),
            _ => None,
        },
        TypeTag::Boolean => match value {
            Value::Bool(b) => Some(Cell::Boolean(*b)),
            Value::Number(_) | Value::String(_) => {
                parse_boolean(&text_of(value)).map(Cell::Boolean)
            }
            _ => None,
        },
    }
}

/// A flattened row conformed to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformed {
    pub row: Row,
    /// Paths present in the input but not in the schema.
    pub dropped: Vec<String>,
    /// Columns whose value could not be coerced and was replaced by null.
    pub nulled: Vec<String>,
}

/// Align a flattened row to `schema`.
///
/// Missing columns become null, unknown paths are dropped. A value that
/// cannot be coerced becomes null unless `strict`, in which case the row
/// fails with [`Error::Coercion`].
pub fn conform_row(row: &FlatRow, schema: &Schema, strict: bool) -> Result<Conformed> {
    let mut cells = Vec::with_capacity(schema.len());
    let mut nulled = Vec::new();

    for column in schema.columns() {
        let cell = match row.get(&column.name) {
            None => Cell::Null,
            Some(value) => match coerce_value(value, column.type_tag) {
                Some(cell) => cell,
                None if strict => {
                    return Err(Error::Coercion {
                        column: column.name.clone(),
                        message: format!(
                            "{} is not representable as {}",
                            text_of(value),
                            column.type_tag
                        ),
                    });
                }
                None => {
                    nulled.push(column.name.clone());
                    Cell::Null
                }
            },
        };
        cells.push(cell);
    }

    let dropped = row
        .keys()
        .filter(|path| schema.index_of(path).is_none())
        .cloned()
        .collect();

    Ok(Conformed {
        row: Row::new(cells),
        dropped,
        nulled,
    })
}
