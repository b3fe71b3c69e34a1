//! Streaming batch materialization
//!
//! Elements are pulled from an [`ElementReader`] into bounded batches. The
//! first batch fixes the schema; every later batch is conformed to it.

use std::collections::HashSet;
use std::io::Read;

use tracing::{debug, warn};

use crate::decode::ElementReader;
use crate::error::Result;
use crate::flatten::{FlatRow, Flattener};
use crate::schema::{FrozenSchema, Schema};
use crate::types::{Batch, CancelToken};

use super::sink::BatchSink;

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Completed,
    Cancelled,
}

/// Counters for one streaming load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub status: StreamStatus,
    pub batches: usize,
    pub rows: usize,
    /// Values at paths the frozen schema does not contain.
    pub dropped_values: usize,
    /// Values that could not be coerced to their column type.
    pub coerced_to_null: usize,
    /// The frozen schema, or `None` if the stream held no elements.
    pub schema: Option<Schema>,
}

/// The sink handed back by a streaming load, with its summary.
#[derive(Debug)]
pub struct StorageLoad<S> {
    pub sink: S,
    pub summary: StreamSummary,
}

/// Drives elements from a reader into a sink, one batch at a time.
pub struct BatchMaterializer<'a> {
    flattener: &'a Flattener,
    batch_size: usize,
    detect_formats: bool,
    strict: bool,
    cancel: Option<&'a CancelToken>,
}

impl<'a> BatchMaterializer<'a> {
    /// `batch_size` must be non-zero; the connector validates it.
    pub fn new(flattener: &'a Flattener, batch_size: usize) -> Self {
        BatchMaterializer {
            flattener,
            batch_size: batch_size.max(1),
            detect_formats: true,
            strict: false,
            cancel: None,
        }
    }

    pub fn with_format_detection(mut self, detect: bool) -> Self {
        self.detect_formats = detect;
        self
    }

    pub fn with_strict_coercion(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Run the stream to completion or cancellation.
    ///
    /// On error the sink is dropped; batches already appended stay appended.
    pub fn run<R, S>(&self, reader: &mut ElementReader<R>, mut sink: S) -> Result<StorageLoad<S>>
    where
        R: Read,
        S: BatchSink,
    {
        let mut frozen: Option<FrozenSchema> = None;
        let mut summary = StreamSummary::default();
        let mut warned_paths: HashSet<String> = HashSet::new();

        loop {
            if self.cancelled() {
                summary.status = StreamStatus::Cancelled;
                break;
            }

            let pending = self.fill(reader)?;
            if pending.is_empty() {
                break;
            }

            let schema = frozen.get_or_insert_with(|| {
                let schema = FrozenSchema::from_first_batch(&pending, self.detect_formats);
                debug!(
                    columns = schema.schema().len(),
                    sample_rows = pending.len(),
                    "schema frozen from first batch"
                );
                schema
            });

            let mut rows = Vec::with_capacity(pending.len());
            for flat in &pending {
                let conformed = schema.conform(flat, self.strict)?;
                for path in &conformed.dropped {
                    if warned_paths.insert(path.clone()) {
                        warn!(path = %path, "dropping path absent from frozen schema");
                    }
                }
                for column in &conformed.nulled {
                    warn!(column = %column, "value not coercible to column type, stored as null");
                }
                summary.dropped_values += conformed.dropped.len();
                summary.coerced_to_null += conformed.nulled.len();
                rows.push(conformed.row);
            }

            if self.cancelled() {
                summary.status = StreamStatus::Cancelled;
                break;
            }

            summary.batches += 1;
            summary.rows += rows.len();
            let batch = Batch {
                index: summary.batches,
                rows,
            };
            debug!(batch = batch.index, rows = batch.len(), "emitting batch");
            sink.append_batch(batch, schema.schema())?;
        }

        if summary.status == StreamStatus::Completed {
            sink.flush()?;
        }
        summary.schema = frozen.map(FrozenSchema::into_schema);
        Ok(StorageLoad { sink, summary })
    }

    /// Pull up to `batch_size` elements and flatten them.
    fn fill<R: Read>(&self, reader: &mut ElementReader<R>) -> Result<Vec<FlatRow>> {
        let mut pending = Vec::with_capacity(self.batch_size);
        while pending.len() < self.batch_size {
            match reader.next_element()? {
                Some(element) => pending.push(self.flattener.flatten_record(&element)?),
                None => break,
            }
        }
        Ok(pending)
    }
}
