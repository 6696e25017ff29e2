// src/observability/mod.rs
//! Logging and metrics setup
//!
//! - **Tracing**: `tracing-subscriber` with `EnvFilter`, pretty or JSON output
//! - **Metrics**: `metrics` gauges for buffer occupancy and accept/reject
//!   counts, recorded into a Prometheus recorder
//!
//! Monitoring code polls [`EventBuffer::stats`](crate::buffer::EventBuffer::stats)
//! and calls [`publish_stats`]; the batch flusher does this on its own cadence.
//! A growing `trace_buffer_rejected_total` means the consumer drains too slowly.

use crate::buffer::BufferStats;
use crate::utils::config::{LogFormat, LoggingConfig};
use crate::utils::errors::{EngineError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const METRIC_SIZE: &str = "trace_buffer_size";
pub const METRIC_ACCEPTED: &str = "trace_buffer_accepted_total";
pub const METRIC_REJECTED: &str = "trace_buffer_rejected_total";
pub const METRIC_FILL: &str = "trace_buffer_fill_percent";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Observability(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    installed.map_err(|e| EngineError::Observability(format!("Failed to set subscriber: {}", e)))
}

/// Install the Prometheus metrics recorder and describe buffer gauges
///
/// The returned handle renders the text exposition format; serving it is
/// left to the host application.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| EngineError::Observability(format!("Failed to install recorder: {}", e)))?;

    metrics::describe_gauge!(METRIC_SIZE, "Records currently buffered");
    metrics::describe_gauge!(METRIC_ACCEPTED, "Records accepted since last counter reset");
    metrics::describe_gauge!(METRIC_REJECTED, "Records rejected since last counter reset");
    metrics::describe_gauge!(METRIC_FILL, "Buffer fill level in percent");

    Ok(handle)
}

/// Record a stats snapshot as gauges
///
/// Counters are published as gauges since the buffer's own counters can be
/// reset by monitoring code.
pub fn publish_stats(stats: &BufferStats) {
    metrics::gauge!(METRIC_SIZE).set(stats.current_size as f64);
    metrics::gauge!(METRIC_ACCEPTED).set(stats.accepted as f64);
    metrics::gauge!(METRIC_REJECTED).set(stats.rejected as f64);
    metrics::gauge!(METRIC_FILL).set(stats.fill_percentage());
}
