// src/buffer/sink.rs
//! Destinations for drained batches
//!
//! The buffer does no I/O itself. A [`BatchFlusher`](crate::buffer::BatchFlusher)
//! drains it and hands each batch to a [`RecordSink`].

use crate::buffer::record::EventRecord;
use crate::utils::errors::{EngineError, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Consumer of drained record batches
pub trait RecordSink: Send + Sync + 'static {
    /// Persist or ship a batch. The batch is dropped if this fails.
    fn write_batch(&self, batch: Vec<EventRecord>) -> impl Future<Output = Result<()>> + Send;
}

/// Emits one structured log event per record
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn write_batch(&self, batch: Vec<EventRecord>) -> impl Future<Output = Result<()>> + Send {
        for record in &batch {
            info!(
                id = %record.id(),
                service = record.service(),
                title = record.title(),
                result = record.result(),
                log_type = record.log_type(),
                action_type = record.action_type(),
                duration_ms = record.duration_ms(),
                "audit record"
            );
        }
        async { Ok(()) }
    }
}

/// Appends records to a file as JSON lines
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    /// Create a sink writing to `path`, creating parent directories
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                EngineError::SinkFailed(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        info!("JSON lines sink writing to {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(batch: &[EventRecord]) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(batch.len() * 256);
        for record in batch {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        Ok(buf)
    }
}

impl RecordSink for JsonLinesSink {
    fn write_batch(&self, batch: Vec<EventRecord>) -> impl Future<Output = Result<()>> + Send {
        async move {
            if batch.is_empty() {
                return Ok(());
            }

            let data = Self::encode(&batch)?;

            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| EngineError::SinkFailed(format!("Failed to open {:?}: {}", self.path, e)))?;

            file.write_all(&data).await?;
            file.flush().await?;

            debug!("Wrote {} records ({} bytes) to {:?}", batch.len(), data.len(), self.path);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_batch(n: usize) -> Vec<EventRecord> {
        (0..n)
            .map(|i| {
                EventRecord::new("billing", format!("charge {}", i))
                    .with_timing(10, 20)
                    .with_result("success")
                    .with_args(vec![serde_json::json!(i)])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_log_sink_accepts_batch() {
        assert!(LogSink.write_batch(create_batch(3)).await.is_ok());
    }

    #[tokio::test]
    async fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("records.jsonl");
        let sink = JsonLinesSink::new(&path).await.unwrap();

        sink.write_batch(create_batch(2)).await.unwrap();
        sink.write_batch(create_batch(1)).await.unwrap();
        sink.write_batch(Vec::new()).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["service"], "billing");
        assert_eq!(first["title"], "charge 0");
        assert_eq!(first["endTime"], 20);
        assert_eq!(first["args"][0], 0);
    }
}
