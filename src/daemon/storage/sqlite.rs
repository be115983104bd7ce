use std::path::PathBuf;

use anyhow::Result;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::{entities::LogEntry, sink::LogSink};

/// Appends entries to a local SQLite database. The connection is opened
/// lazily on first use and kept for the process lifetime; there is no
/// reconnect-on-error beyond the initial schema check.
pub struct SqliteSink {
    path: PathBuf,
    connection: Option<Connection>,
}

impl SqliteSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            connection: None,
        }
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        if self.connection.is_none() {
            debug!("Opening log database at {:?}", self.path);
            let connection = Connection::open(&self.path)?;
            ensure_schema(&connection)?;
            self.connection = Some(connection);
        }
        // Just populated above.
        Ok(self.connection.as_mut().unwrap())
    }
}

/// Attempts a trivial read; a failure means the relation is missing and the
/// table plus its indexes get created.
fn ensure_schema(connection: &Connection) -> Result<()> {
    let present = match connection.query_row("SELECT id FROM log LIMIT 1", [], |_| Ok(())) {
        Ok(()) | Err(rusqlite::Error::QueryReturnedNoRows) => true,
        Err(_) => false,
    };
    if present {
        return Ok(());
    }

    info!("Creating log schema");
    connection.execute_batch(
        "CREATE TABLE log (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            timezone TEXT NOT NULL,
            type TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            duration REAL NULL,
            origin TEXT NOT NULL
        );
        CREATE INDEX date_timezone ON log(date, timezone);
        CREATE INDEX type_key_origin ON log(type, key, origin);
        CREATE INDEX key_value ON log(key, value);
        CREATE INDEX duration ON log(duration);",
    )?;
    Ok(())
}

impl LogSink for SqliteSink {
    async fn ensure_schema(&mut self) -> Result<()> {
        self.connection()?;
        Ok(())
    }

    async fn append(&mut self, entry: LogEntry) -> Result<()> {
        let connection = self.connection()?;
        connection.execute(
            "INSERT INTO log (date, timezone, type, key, value, duration, origin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.date.to_rfc3339(),
                entry.timezone,
                entry.kind.as_str(),
                entry.key.as_ref(),
                entry.value.as_ref(),
                entry.duration,
                entry.origin.as_str(),
            ],
        )?;
        Ok(())
    }
}
