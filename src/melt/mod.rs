//! Streaming JSON into tabular batches
//!
//! A root array is consumed element by element and emitted to a
//! [`BatchSink`] in bounded, ordered batches.
//!
//! ## Schema stability
//!
//! The schema is inferred from the first batch only and then frozen. Paths
//! first seen later are dropped, and conflicting values are coerced to the
//! frozen type (or nulled) rather than widening the schema mid-stream.

pub mod materializer;
pub mod sink;

pub use materializer::{BatchMaterializer, StorageLoad, StreamStatus, StreamSummary};
pub use sink::{BatchSink, JsonLinesSink, MemorySink};
