use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::error::Error;
use crate::schema::Schema;

/// A scalar value already coerced to its column's type.
///
/// Nested columns store their canonical JSON text as `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// JSON form of the cell. Non-finite floats have no JSON form and become null.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Integer(i) => Value::Number(Number::from(*i)),
            Cell::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Boolean(b) => Value::Bool(*b),
            Cell::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Boolean(b) => write!(f, "{b}"),
            Cell::String(s) => f.write_str(s),
        }
    }
}

/// One table row: cells in the same order as the schema's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Look up a cell by column name through the row's schema.
    pub fn get_named<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a Cell> {
        schema.index_of(name).and_then(|idx| self.cells.get(idx))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A bounded group of schema-conforming rows handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// 1-based position of the batch in the stream.
    pub index: usize,
    pub rows: Vec<Row>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Minimal in-memory table: a schema plus rows aligned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Table { schema, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    /// Cell at (`row`, `column`), by column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        self.rows
            .get(row)
            .and_then(|r| r.get_named(&self.schema, column))
    }
}

/// What the flattener does with a subtree nested deeper than `max_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingOverflow {
    /// Fail with `Error::StructureTooComplex`.
    #[default]
    Fail,
    /// Keep the remaining subtree as a single Nested leaf.
    Embed,
}

/// Callback offered every error before it is returned to the caller.
pub type ErrorObserver = Arc<dyn Fn(&Error) + Send + Sync>;

/// Configuration for a connector instance
#[derive(Clone)]
pub struct ConnectorConfig {
    /// Maximum container depth the flattener descends into
    pub max_depth: usize,

    /// Behaviour once `max_depth` is exceeded
    pub nesting_overflow: NestingOverflow,

    /// Bytes requested from the source per read while streaming
    pub read_chunk_size: usize,

    /// Whether String columns get a format hint (date, email, ...)
    pub detect_formats: bool,

    /// Fail on values that cannot be coerced instead of storing null
    pub strict_coercion: bool,

    /// Optional side channel for every raised error
    pub observer: Option<ErrorObserver>,
}

impl ConnectorConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_nesting_overflow(mut self, overflow: NestingOverflow) -> Self {
        self.nesting_overflow = overflow;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn with_detect_formats(mut self, detect: bool) -> Self {
        self.detect_formats = detect;
        self
    }

    pub fn with_strict_coercion(mut self, strict: bool) -> Self {
        self.strict_coercion = strict;
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        ConnectorConfig {
            max_depth: 64,
            nesting_overflow: NestingOverflow::Fail,
            read_chunk_size: 64 * 1024,
            detect_formats: true,
            strict_coercion: false,
            observer: None,
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("max_depth", &self.max_depth)
            .field("nesting_overflow", &self.nesting_overflow)
            .field("read_chunk_size", &self.read_chunk_size)
            .field("detect_formats", &self.detect_formats)
            .field("strict_coercion", &self.strict_coercion)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Cooperative cancellation flag checked by the streaming driver between batches.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
