use anyhow::Result;

use super::entities::LogEntry;

/// Interface for abstracting the backing store of finalized entries. Writes
/// are append-only and must be applied strictly in emission order; duration
/// semantics assume sequential history, so there is exactly one logical
/// writer holding `&mut` access.
pub trait LogSink {
    /// Verifies the backing relation exists, creating it if needed. Safe to
    /// call any number of times.
    fn ensure_schema(&mut self) -> impl std::future::Future<Output = Result<()>>;

    /// Appends one immutable entry. Never updates or deletes. A failed
    /// append loses the entry; there is no retry or write-ahead buffer.
    fn append(&mut self, entry: LogEntry) -> impl std::future::Future<Output = Result<()>>;
}
