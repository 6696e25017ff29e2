// src/buffer/flusher.rs
//! Periodic consumer for the event buffer
//!
//! Runs a background task that drains the buffer on a fixed interval and
//! hands each batch to a [`RecordSink`]. Failed batches are logged and
//! dropped; there is no retry.
//!
//! ```text
//! enqueue() ──► EventBuffer ──► tick / flush() ──► drain_all() ──► RecordSink
//!                                     │
//!                                     └─ every N ticks ─► publish_stats()
//! ```

use crate::buffer::event_buffer::EventBuffer;
use crate::buffer::sink::RecordSink;
use crate::observability;
use crate::utils::config::FlusherConfig;
use crate::utils::errors::{EngineError, Result};
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

enum Command {
    Flush(oneshot::Sender<usize>),
    Shutdown(oneshot::Sender<usize>),
}

/// Background drain task for an [`EventBuffer`]
///
/// `B` is any shared handle to a buffer: the global `&'static EventBuffer`
/// by default, or an `Arc<EventBuffer>`.
pub struct BatchFlusher<S, B = &'static EventBuffer>
where
    S: RecordSink,
    B: Deref<Target = EventBuffer> + Clone + Send + Sync + 'static,
{
    config: FlusherConfig,
    buffer: B,
    sink: Arc<S>,
    commands: Option<mpsc::UnboundedSender<Command>>,
    writer_handle: Option<JoinHandle<()>>,
    stats: Arc<Mutex<FlusherStats>>,
}

impl<S: RecordSink> BatchFlusher<S> {
    /// Flusher draining the process-wide buffer
    pub fn for_global(sink: S, config: FlusherConfig) -> Self {
        Self::new(EventBuffer::global(), sink, config)
    }
}

impl<S, B> BatchFlusher<S, B>
where
    S: RecordSink,
    B: Deref<Target = EventBuffer> + Clone + Send + Sync + 'static,
{
    pub fn new(buffer: B, sink: S, config: FlusherConfig) -> Self {
        Self {
            config,
            buffer,
            sink: Arc::new(sink),
            commands: None,
            writer_handle: None,
            stats: Arc::new(Mutex::new(FlusherStats::default())),
        }
    }

    /// Spawn the background drain task
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            warn!("Batch flusher already running");
            return Ok(());
        }
        if self.config.interval_ms == 0 {
            return Err(EngineError::Config(
                "flusher.interval_ms must be greater than zero".to_string(),
            ));
        }

        info!("Starting batch flusher (interval {}ms)", self.config.interval_ms);

        let buffer = self.buffer.clone();
        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let interval_ms = self.config.interval_ms;
        let mut reporter = Reporter::new(&self.config);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let period = Duration::from_millis(interval_ms);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        Self::drain_once(&buffer, &sink, &stats).await;
                        reporter.tick(&buffer);
                    }

                    command = rx.recv() => {
                        match command {
                            Some(Command::Flush(ack)) => {
                                let drained = Self::drain_once(&buffer, &sink, &stats).await;
                                let _ = ack.send(drained);
                            }
                            Some(Command::Shutdown(ack)) => {
                                let drained = Self::drain_once(&buffer, &sink, &stats).await;
                                let _ = ack.send(drained);
                                break;
                            }
                            None => {
                                Self::drain_once(&buffer, &sink, &stats).await;
                                break;
                            }
                        }
                    }
                }
            }

            debug!("Batch flusher stopped");
        });

        self.commands = Some(tx);
        self.writer_handle = Some(handle);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.writer_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Drain and write immediately; returns the number of records drained
    ///
    /// Runs inline when the background task has not been started.
    pub async fn flush(&self) -> Result<usize> {
        match &self.commands {
            Some(tx) => {
                let (ack, done) = oneshot::channel();
                tx.send(Command::Flush(ack))
                    .map_err(|_| EngineError::FlusherStopped)?;
                done.await.map_err(|_| EngineError::FlusherStopped)
            }
            None => Ok(Self::drain_once(&self.buffer, &self.sink, &self.stats).await),
        }
    }

    /// Final drain, then stop the background task
    pub async fn shutdown(&mut self) -> Result<usize> {
        info!("Shutting down batch flusher");

        let drained = match self.commands.take() {
            Some(tx) => {
                let (ack, done) = oneshot::channel();
                tx.send(Command::Shutdown(ack))
                    .map_err(|_| EngineError::FlusherStopped)?;
                done.await.map_err(|_| EngineError::FlusherStopped)?
            }
            None => Self::drain_once(&self.buffer, &self.sink, &self.stats).await,
        };

        if let Some(handle) = self.writer_handle.take() {
            if let Err(e) = handle.await {
                error!("Batch flusher task failed: {}", e);
            }
        }

        Ok(drained)
    }

    /// Get flusher statistics
    pub async fn stats(&self) -> FlusherStats {
        self.stats.lock().await.clone()
    }

    async fn drain_once(
        buffer: &EventBuffer,
        sink: &S,
        stats: &Mutex<FlusherStats>,
    ) -> usize {
        let batch = buffer.drain_all();
        if batch.is_empty() {
            return 0;
        }

        let count = batch.len();
        let start = Instant::now();
        let written = sink.write_batch(batch).await;
        let elapsed = start.elapsed();

        let mut s = stats.lock().await;
        match written {
            Ok(()) => {
                s.batches_written += 1;
                s.records_written += count as u64;
                s.total_write_time_ms += elapsed.as_millis() as u64;
                debug!("Flushed {} records in {:?}", count, elapsed);
            }
            Err(e) => {
                s.write_failures += 1;
                s.records_dropped += count as u64;
                error!("Failed to write batch of {} records: {}", count, e);
            }
        }

        count
    }
}

/// Publishes buffer stats on its own cadence
struct Reporter {
    every: u32,
    reset: bool,
    ticks: u32,
    last_rejected: u64,
}

impl Reporter {
    fn new(config: &FlusherConfig) -> Self {
        Self {
            every: config.report_every,
            reset: config.reset_counters_on_report,
            ticks: 0,
            last_rejected: 0,
        }
    }

    fn tick(&mut self, buffer: &EventBuffer) {
        if self.every == 0 {
            return;
        }
        self.ticks += 1;
        if self.ticks < self.every {
            return;
        }
        self.ticks = 0;

        let stats = buffer.stats();
        observability::publish_stats(&stats);

        if stats.rejected > self.last_rejected {
            warn!(
                rejected = stats.rejected,
                reject_rate = stats.reject_rate(),
                "Event buffer is dropping records, drain is falling behind producers"
            );
        }

        if self.reset {
            buffer.reset_counters();
            self.last_rejected = 0;
        } else {
            self.last_rejected = stats.rejected;
        }
    }
}

/// Flusher statistics
#[derive(Debug, Clone, Default)]
pub struct FlusherStats {
    pub batches_written: u64,
    pub records_written: u64,
    pub write_failures: u64,
    pub records_dropped: u64,
    pub total_write_time_ms: u64,
}

impl FlusherStats {
    pub fn avg_batch_size(&self) -> u64 {
        if self.batches_written == 0 {
            0
        } else {
            self.records_written / self.batches_written
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::record::EventRecord;
    use crate::buffer::sink::LogSink;
    use std::future::Future;

    #[derive(Default)]
    struct CollectingSink {
        titles: Mutex<Vec<String>>,
    }

    impl RecordSink for Arc<CollectingSink> {
        fn write_batch(&self, batch: Vec<EventRecord>) -> impl Future<Output = Result<()>> + Send {
            async move {
                let mut titles = self.titles.lock().await;
                titles.extend(batch.iter().map(|r| r.title().to_string()));
                Ok(())
            }
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write_batch(&self, _batch: Vec<EventRecord>) -> impl Future<Output = Result<()>> + Send {
            async { Err(EngineError::SinkFailed("unreachable collector".to_string())) }
        }
    }

    fn slow_config() -> FlusherConfig {
        FlusherConfig {
            interval_ms: 60_000,
            report_every: 0,
            reset_counters_on_report: false,
        }
    }

    fn fill(buffer: &EventBuffer, n: usize) {
        for i in 0..n {
            let _ = buffer.enqueue(EventRecord::new("svc", format!("r{}", i)));
        }
    }

    #[tokio::test]
    async fn test_flush_delivers_in_order() {
        let buffer = Arc::new(EventBuffer::new(16));
        let sink = Arc::new(CollectingSink::default());
        let mut flusher = BatchFlusher::new(Arc::clone(&buffer), Arc::clone(&sink), slow_config());
        flusher.start().unwrap();
        assert!(flusher.is_running());

        fill(&buffer, 5);
        assert_eq!(flusher.flush().await.unwrap(), 5);
        assert!(buffer.is_empty());

        let titles = sink.titles.lock().await.clone();
        assert_eq!(titles, vec!["r0", "r1", "r2", "r3", "r4"]);

        let stats = flusher.stats().await;
        assert_eq!(stats.records_written, 5);
        assert_eq!(stats.batches_written, 1);

        flusher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_remaining() {
        let buffer = Arc::new(EventBuffer::new(16));
        let sink = Arc::new(CollectingSink::default());
        let mut flusher = BatchFlusher::new(Arc::clone(&buffer), Arc::clone(&sink), slow_config());
        flusher.start().unwrap();
        fill(&buffer, 3);

        assert_eq!(flusher.shutdown().await.unwrap(), 3);
        assert!(!flusher.is_running());
        assert_eq!(sink.titles.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_drop_drains_remaining() {
        let buffer = Arc::new(EventBuffer::new(16));
        let sink = Arc::new(CollectingSink::default());
        let mut flusher = BatchFlusher::new(Arc::clone(&buffer), Arc::clone(&sink), slow_config());
        flusher.start().unwrap();
        fill(&buffer, 3);

        drop(flusher);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(buffer.is_empty());
        assert_eq!(sink.titles.lock().await.clone(), vec!["r0", "r1", "r2"]);
    }

    #[tokio::test]
    async fn test_flush_without_start_runs_inline() {
        let buffer = Arc::new(EventBuffer::new(8));
        let sink = Arc::new(CollectingSink::default());
        let flusher = BatchFlusher::new(Arc::clone(&buffer), Arc::clone(&sink), slow_config());

        fill(&buffer, 2);
        assert_eq!(flusher.flush().await.unwrap(), 2);
        assert_eq!(sink.titles.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_batch_is_dropped() {
        let buffer = Arc::new(EventBuffer::new(8));
        let flusher = BatchFlusher::new(Arc::clone(&buffer), FailingSink, slow_config());

        fill(&buffer, 4);
        assert_eq!(flusher.flush().await.unwrap(), 4);
        assert!(buffer.is_empty());

        let stats = flusher.stats().await;
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.records_dropped, 4);
        assert_eq!(stats.records_written, 0);
    }

    #[tokio::test]
    async fn test_report_resets_counters() {
        let buffer = Arc::new(EventBuffer::new(1));
        fill(&buffer, 2);
        assert_eq!(buffer.rejected_count(), 1);

        let config = FlusherConfig {
            interval_ms: 10,
            report_every: 1,
            reset_counters_on_report: true,
        };
        let sink = Arc::new(CollectingSink::default());
        let mut flusher = BatchFlusher::new(Arc::clone(&buffer), Arc::clone(&sink), config);
        flusher.start().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(buffer.accepted_count(), 0);
        assert_eq!(buffer.rejected_count(), 0);
        assert_eq!(sink.titles.lock().await.clone(), vec!["r0"]);

        flusher.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_rejects_zero_interval() {
        let buffer = Arc::new(EventBuffer::new(4));
        let config = FlusherConfig {
            interval_ms: 0,
            ..slow_config()
        };
        let mut flusher = BatchFlusher::new(buffer, LogSink, config);
        assert!(flusher.start().is_err());
        assert!(!flusher.is_running());
    }
}
