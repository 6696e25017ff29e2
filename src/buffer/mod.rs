// src/buffer/mod.rs
//! Audit/trace event buffering
//!
//! - **Record**: one logged unit of request work
//! - **Event Buffer**: bounded lock-free queue with accept/reject counters
//! - **Global**: the process-wide buffer instance
//! - **Flusher**: periodic drain task feeding a sink
//! - **Sink**: batch destinations (structured log, JSON lines file)
//!
//! # Architecture
//!
//! ```text
//! Interceptors ─► enqueue() ─► EventBuffer (capacity C) ─► drain_all() ─► BatchFlusher ─► RecordSink
//!   (many)        never blocks      │                        (≤ C per call)    (one task)
//!                                   └─ full: record rejected, rejected_count += 1
//! ```
//!
//! Dropping records under load is intended: request paths must never wait on
//! logging. A rising rejected count means the flusher is too slow or too
//! infrequent.

pub mod event_buffer;
pub mod flusher;
pub mod global;
pub mod record;
pub mod sink;

// Re-export commonly used types
pub use event_buffer::{BufferStats, EnqueueOutcome, EventBuffer};
pub use flusher::{BatchFlusher, FlusherStats};
pub use global::install_global;
pub use record::{EventRecord, TraceContext};
pub use sink::{JsonLinesSink, LogSink, RecordSink};
