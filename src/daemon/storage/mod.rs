//! Persistence for finalized activity records. The basic idea is:
//!  - [sink::LogSink] is the append-only contract the pipeline writes to.
//!  - [sqlite::SqliteSink] keeps a `log` relation with secondary indexes.
//!  - [ndjson::NdjsonSink] keeps one JSON object per line in a flat file.

use anyhow::Result;

use self::{entities::LogEntry, ndjson::NdjsonSink, sink::LogSink, sqlite::SqliteSink};

pub mod entities;
pub mod ndjson;
pub mod sink;
pub mod sqlite;

/// Runtime-selected sink backend.
pub enum AnySink {
    Sqlite(SqliteSink),
    Ndjson(NdjsonSink),
}

impl LogSink for AnySink {
    async fn ensure_schema(&mut self) -> Result<()> {
        match self {
            AnySink::Sqlite(sink) => sink.ensure_schema().await,
            AnySink::Ndjson(sink) => sink.ensure_schema().await,
        }
    }

    async fn append(&mut self, entry: LogEntry) -> Result<()> {
        match self {
            AnySink::Sqlite(sink) => sink.append(entry).await,
            AnySink::Ndjson(sink) => sink.append(entry).await,
        }
    }
}
