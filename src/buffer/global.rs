// src/buffer/global.rs
//! Process-wide event buffer
//!
//! Interceptors on every request path share one buffer. It is created on
//! first access (or explicitly via [`install_global`]) and lives until the
//! process exits; anything still buffered at that point is lost.

use crate::buffer::event_buffer::EventBuffer;
use crate::utils::config::{BufferConfig, DEFAULT_CAPACITY};
use crate::utils::errors::{EngineError, Result};
use once_cell::sync::OnceCell;
use tracing::info;

static GLOBAL_BUFFER: OnceCell<EventBuffer> = OnceCell::new();

impl EventBuffer {
    /// The process-wide buffer, created with [`DEFAULT_CAPACITY`] on first use
    ///
    /// Concurrent first calls block briefly on initialization and all observe
    /// the same instance.
    pub fn global() -> &'static EventBuffer {
        GLOBAL_BUFFER.get_or_init(|| {
            info!("Initializing global event buffer with capacity {}", DEFAULT_CAPACITY);
            EventBuffer::new(DEFAULT_CAPACITY)
        })
    }
}

/// Create the process-wide buffer from configuration
///
/// Must run before the first [`EventBuffer::global`] call; afterwards the
/// instance is fixed and this returns [`EngineError::AlreadyInitialized`].
pub fn install_global(config: &BufferConfig) -> Result<&'static EventBuffer> {
    config.validate()?;

    let mut installed = false;
    let buffer = GLOBAL_BUFFER.get_or_init(|| {
        installed = true;
        info!("Initializing global event buffer with capacity {}", config.capacity);
        EventBuffer::new(config.capacity)
    });

    if installed {
        Ok(buffer)
    } else {
        Err(EngineError::AlreadyInitialized)
    }
}
