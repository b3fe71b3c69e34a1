use std::io::Write;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::{Batch, Table};

/// Receiver of materialized batches.
///
/// Batches arrive in order, each at most once. The schema passed alongside
/// is the same for every batch of a stream.
pub trait BatchSink {
    fn append_batch(&mut self, batch: Batch, schema: &Schema) -> Result<()>;

    /// Called once after the last batch of a completed stream.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: BatchSink + ?Sized> BatchSink for &mut S {
    fn append_batch(&mut self, batch: Batch, schema: &Schema) -> Result<()> {
        (**self).append_batch(batch, schema)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Collects every batch in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<Batch>,
    schema: Option<Schema>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Concatenate all received rows into one table.
    pub fn into_table(self) -> Table {
        let rows = self.batches.into_iter().flat_map(|b| b.rows).collect();
        Table::new(self.schema.unwrap_or_default(), rows)
    }
}

impl BatchSink for MemorySink {
    fn append_batch(&mut self, batch: Batch, schema: &Schema) -> Result<()> {
        if self.schema.is_none() {
            self.schema = Some(schema.clone());
        }
        self.batches.push(batch);
        Ok(())
    }
}

/// Writes each row as one flat JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    rows_written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink {
            writer,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BatchSink for JsonLinesSink<W> {
    fn append_batch(&mut self, batch: Batch, schema: &Schema) -> Result<()> {
        for row in &batch.rows {
            let mut object = Map::with_capacity(schema.len());
            for (column, cell) in schema.columns().iter().zip(row.cells()) {
                object.insert(column.name.clone(), cell.to_json());
            }
            let line = serde_json::to_string(&Value::Object(object)).map_err(Error::sink)?;
            writeln!(self.writer, "{line}").map_err(Error::sink)?;
            self.rows_written += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TypeTag};
    use crate::types::{Cell, Row};

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", TypeTag::Integer, false),
            Column::new("name", TypeTag::String, true),
        ])
    }

    fn batch(index: usize, ids: &[i64]) -> Batch {
        Batch {
            index,
            rows: ids
                .iter()
                .map(|&id| Row::new(vec![Cell::Integer(id), Cell::Null]))
                .collect(),
        }
    }

    #[test]
    fn test_memory_sink_into_table() {
        let mut sink = MemorySink::new();
        sink.append_batch(batch(1, &[1, 2]), &schema()).unwrap();
        sink.append_batch(batch(2, &[3]), &schema()).unwrap();
        assert_eq!(sink.batches().len(), 2);

        let table = sink.into_table();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.schema, schema());
        assert_eq!(table.value(2, "id"), Some(&Cell::Integer(3)));
    }

    #[test]
    fn test_json_lines_sink() {
        let mut buffer = Vec::new();
        let mut sink = JsonLinesSink::new(&mut buffer);
        sink.append_batch(batch(1, &[1, 2]), &schema()).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.rows_written(), 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![r#"{"id":1,"name":null}"#, r#"{"id":2,"name":null}"#]);
    }

    #[test]
    fn test_sink_through_mutable_reference() {
        fn feed<S: BatchSink>(mut sink: S) {
            sink.append_batch(batch(1, &[9]), &schema()).unwrap();
        }
        let mut sink = MemorySink::new();
        feed(&mut sink);
        assert_eq!(sink.batches().len(), 1);
    }
}
