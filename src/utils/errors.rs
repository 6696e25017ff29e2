// src/utils/errors.rs
//! Error types for the ambient surfaces of the buffer.
//!
//! The buffer's hot-path operations never return these: `enqueue` folds
//! every failure into a rejection, and draining or reading counters cannot
//! fail. Errors only come from setup (configuration, the global instance,
//! observability) and from the consumer side (sinks).

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,

    #[error("global event buffer already initialized")]
    AlreadyInitialized,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("batch flusher is not running")]
    FlusherStopped,

    #[error("sink write failed: {0}")]
    SinkFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("observability setup failed: {0}")]
    Observability(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, EngineError>;
