use std::path::PathBuf;

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;

use super::{entities::LogEntry, sink::LogSink};

/// Appends entries as newline-delimited JSON, one UTF-8 object per line.
/// The file is opened lazily on first use and kept for the process lifetime.
pub struct NdjsonSink {
    path: PathBuf,
    file: Option<File>,
}

impl NdjsonSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    async fn file(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            debug!("Opening log file at {:?}", self.path);
            let file = File::options()
                .append(true)
                .create(true)
                .open(&self.path)
                .await?;
            self.file = Some(file);
        }
        // Just populated above.
        Ok(self.file.as_mut().unwrap())
    }
}

impl LogSink for NdjsonSink {
    async fn ensure_schema(&mut self) -> Result<()> {
        self.file().await?;
        Ok(())
    }

    async fn append(&mut self, entry: LogEntry) -> Result<()> {
        let mut buffer = serde_json::to_vec(&entry)?;
        buffer.push(b'\n');

        let file = self.file().await?;
        // Semi-safe acquire-release for the file.
        file.lock_exclusive()?;
        let result = write_line(&mut *file, &buffer).await;
        file.unlock_async().await?;
        result
    }
}

async fn write_line(file: &mut File, buffer: &[u8]) -> Result<()> {
    file.write_all(buffer).await?;
    file.flush().await?;
    Ok(())
}
