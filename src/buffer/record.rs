// src/buffer/record.rs
//! Request-lifecycle record carried through the buffer
//!
//! An [`EventRecord`] is assembled by the interceptor layer once a unit of
//! request work completes (or fails) and is then handed to
//! [`EventBuffer::enqueue`](crate::buffer::EventBuffer::enqueue). The buffer
//! stores and returns it whole; the trace context, span and payload are
//! never inspected.

use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Opaque correlation handle shared with the producer
///
/// Wraps whatever context type the caller's tracing stack uses. Only the
/// owner of the concrete type can look inside via [`TraceContext::downcast_ref`].
#[derive(Clone)]
pub struct TraceContext(Arc<dyn Any + Send + Sync>);

impl TraceContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(inner: Arc<dyn Any + Send + Sync>) -> Self {
        Self(inner)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether two handles point at the same context
    pub fn ptr_eq(&self, other: &TraceContext) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TraceContext(..)")
    }
}

/// One logged unit of request work
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Unique record ID (assigned at construction)
    id: Ulid,

    #[serde(skip)]
    trace_context: Option<TraceContext>,

    #[serde(skip)]
    span: tracing::Span,

    /// Emitting component
    service: String,

    /// Epoch milliseconds
    start_time: i64,

    /// Epoch milliseconds
    end_time: i64,

    /// Outcome marker (caller vocabulary)
    result: String,

    /// Response object
    payload: serde_json::Value,

    log_type: String,

    action_type: String,

    /// Method arguments, in call order
    args: Vec<serde_json::Value>,

    title: String,
}

impl EventRecord {
    /// Create a record with empty timing, classification and payload
    pub fn new(service: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            trace_context: None,
            span: tracing::Span::none(),
            service: service.into(),
            start_time: 0,
            end_time: 0,
            result: String::new(),
            payload: serde_json::Value::Null,
            log_type: String::new(),
            action_type: String::new(),
            args: Vec::new(),
            title: title.into(),
        }
    }

    /// Current wall-clock time in epoch milliseconds
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    pub fn with_trace_context(mut self, context: TraceContext) -> Self {
        self.trace_context = Some(context);
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_timing(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set log and action classification tags
    pub fn with_types(mut self, log_type: impl Into<String>, action_type: impl Into<String>) -> Self {
        self.log_type = log_type.into();
        self.action_type = action_type.into();
        self
    }

    pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
        self.args = args;
        self
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.trace_context.as_ref()
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    /// Elapsed time in milliseconds, zero if the end precedes the start
    pub fn duration_ms(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time).max(0)
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn log_type(&self) -> &str {
        &self.log_type
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Take the owned payload and arguments out of the record
    pub fn into_payload_and_args(self) -> (serde_json::Value, Vec<serde_json::Value>) {
        (self.payload, self.args)
    }
}
