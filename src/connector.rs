//! The JSON connector: whole-document loads, streaming loads and
//! serialization behind one configured instance.
//!
//! Every error raised by a public operation is logged and offered to the
//! configured observer exactly once, then returned unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::decode::{decode, ElementReader};
use crate::error::{Error, Result};
use crate::flatten::Flattener;
use crate::melt::{BatchMaterializer, BatchSink, StorageLoad};
use crate::schema::{conform_row, infer_table_schema};
use crate::serialize::{serialize_table, serialize_table_pretty};
use crate::source::Source;
use crate::types::{CancelToken, ConnectorConfig, Table};

/// Identifier reported by [`JsonConnector::connector_id`].
pub const CONNECTOR_ID: &str = "json";

pub struct JsonConnector {
    config: ConnectorConfig,
    flattener: Flattener,
    reading: AtomicBool,
}

/// Clears the in-flight flag when a read ends, however it ends.
struct ReadGuard<'a>(&'a AtomicBool);

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn report(config: &ConnectorConfig, err: &Error) {
    error!(kind = err.kind(), error = %err, "json connector operation failed");
    if let Some(observer) = &config.observer {
        observer(err);
    }
}

impl JsonConnector {
    /// Create a connector, rejecting a zero `max_depth` or `read_chunk_size`.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let invalid = if config.max_depth == 0 {
            Some("max_depth must be at least 1")
        } else if config.read_chunk_size == 0 {
            Some("read_chunk_size must be positive")
        } else {
            None
        };
        if let Some(message) = invalid {
            let err = Error::InvalidArgument(message.to_string());
            report(&config, &err);
            return Err(err);
        }

        Ok(JsonConnector {
            flattener: Flattener::from_config(&config),
            config,
            reading: AtomicBool::new(false),
        })
    }

    pub fn connector_id(&self) -> &'static str {
        CONNECTOR_ID
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Load a whole document into a table.
    ///
    /// An object root gives one row. An array root gives one row per element,
    /// with columns in first-seen order and types widened across all rows.
    pub fn get_data(&self, source: Source) -> Result<Table> {
        self.observe(self.load(source))
    }

    /// Build a table from an already decoded document.
    pub fn table_from_value(&self, value: &Value) -> Result<Table> {
        self.observe(self.build_table(value))
    }

    /// Stream a root array into `sink` in batches of `batch_size` elements.
    pub fn get_storage_data<S: BatchSink>(
        &self,
        source: Source,
        sink: S,
        batch_size: usize,
    ) -> Result<StorageLoad<S>> {
        self.observe(self.stream(source, sink, batch_size, None))
    }

    /// Like [`get_storage_data`](Self::get_storage_data), stopping between
    /// batches once `cancel` is triggered.
    pub fn get_storage_data_with_cancel<S: BatchSink>(
        &self,
        source: Source,
        sink: S,
        batch_size: usize,
        cancel: &CancelToken,
    ) -> Result<StorageLoad<S>> {
        self.observe(self.stream(source, sink, batch_size, Some(cancel)))
    }

    /// Serialize a table back to JSON text.
    pub fn serialize(&self, table: &Table) -> Result<String> {
        self.observe(serialize_table(table))
    }

    /// Like [`serialize`](Self::serialize), with indented output.
    pub fn serialize_pretty(&self, table: &Table) -> Result<String> {
        self.observe(serialize_table_pretty(table))
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            report(&self.config, err);
        }
        result
    }

    fn begin_read(&self) -> Result<ReadGuard<'_>> {
        self.reading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                Error::InvalidArgument("a read is already in progress on this connector".into())
            })?;
        Ok(ReadGuard(&self.reading))
    }

    fn load(&self, source: Source) -> Result<Table> {
        let _guard = self.begin_read()?;
        info!(source = %source.describe(), "loading json document");

        let bytes = source.read_all()?;
        let value = decode(&bytes)?;
        let table = self.build_table(&value)?;

        info!(
            rows = table.num_rows(),
            columns = table.num_columns(),
            bytes = bytes.len(),
            "json document loaded"
        );
        Ok(table)
    }

    fn build_table(&self, value: &Value) -> Result<Table> {
        let mut flat_rows = Vec::new();
        self.flattener.flatten(value, &mut flat_rows)?;
        let schema = infer_table_schema(&flat_rows, self.config.detect_formats);

        let mut rows = Vec::with_capacity(flat_rows.len());
        for flat in &flat_rows {
            let conformed = conform_row(flat, &schema, self.config.strict_coercion)?;
            for column in &conformed.nulled {
                warn!(column = %column, "value not coercible to column type, stored as null");
            }
            rows.push(conformed.row);
        }
        Ok(Table::new(schema, rows))
    }

    fn stream<S: BatchSink>(
        &self,
        source: Source,
        sink: S,
        batch_size: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<StorageLoad<S>> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }
        let _guard = self.begin_read()?;
        info!(source = %source.describe(), batch_size, "streaming json document");

        let mut elements =
            ElementReader::with_chunk_size(source.open()?, self.config.read_chunk_size);
        let mut materializer = BatchMaterializer::new(&self.flattener, batch_size)
            .with_format_detection(self.config.detect_formats)
            .with_strict_coercion(self.config.strict_coercion);
        if let Some(token) = cancel {
            materializer = materializer.with_cancel(token);
        }
        let load = materializer.run(&mut elements, sink)?;

        let summary = &load.summary;
        info!(
            status = ?summary.status,
            batches = summary.batches,
            rows = summary.rows,
            dropped_values = summary.dropped_values,
            coerced_to_null = summary.coerced_to_null,
            "json stream finished"
        );
        Ok(load)
    }
}
