// src/lib.rs
//! Trace Buffer
//!
//! In-process buffering of request audit/trace records. Request interceptors
//! enqueue an [`EventRecord`] per unit of work; a periodic consumer drains
//! the buffer in batches and ships them elsewhere.
//!
//! # Modules
//!
//! - **buffer**: records, the bounded buffer, the global instance, flusher and sinks
//! - **observability**: tracing subscriber and metrics setup
//! - **utils**: configuration and errors
//!
//! # Example
//!
//! ```no_run
//! use trace_buffer::{EventBuffer, EventRecord};
//!
//! let start = EventRecord::now_millis();
//! let record = EventRecord::new("order-service", "create order")
//!     .with_timing(start, EventRecord::now_millis())
//!     .with_result("0");
//!
//! if EventBuffer::global().enqueue(record).is_rejected() {
//!     // dropped under load, never retried
//! }
//!
//! let batch = EventBuffer::global().drain_all();
//! assert!(batch.len() <= EventBuffer::global().capacity());
//! ```

pub mod buffer;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use buffer::{
    install_global, BatchFlusher, BufferStats, EnqueueOutcome, EventBuffer, EventRecord,
    RecordSink, TraceContext,
};
pub use utils::config::{EngineConfig, DEFAULT_CAPACITY};
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
