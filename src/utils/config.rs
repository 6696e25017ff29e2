// src/utils/config.rs
//! Engine configuration
//!
//! Values are layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Optional `trace-buffer.toml` (or a path passed to [`EngineConfig::load_from`])
//! 3. Environment variables prefixed `TRACE_BUFFER__`, e.g.
//!    `TRACE_BUFFER__BUFFER__CAPACITY=5000`

use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default buffer capacity, also the maximum size of a single drain
pub const DEFAULT_CAPACITY: usize = 100_000;

const DEFAULT_CONFIG_FILE: &str = "trace-buffer.toml";
const ENV_PREFIX: &str = "TRACE_BUFFER";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub buffer: BufferConfig,
    pub flusher: FlusherConfig,
    pub logging: LoggingConfig,
}

/// Buffer sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of undrained records
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Periodic drain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlusherConfig {
    /// Drain interval (milliseconds)
    pub interval_ms: u64,

    /// Publish buffer stats every N ticks (0 disables reporting)
    pub report_every: u32,

    /// Reset accept/reject counters after each report
    pub reset_counters_on_report: bool,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            report_every: 10,
            reset_counters_on_report: false,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG` when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl EngineConfig {
    /// Load from `trace-buffer.toml` in the working directory (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given file (if present) and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.buffer.validate()?;

        if self.flusher.interval_ms == 0 {
            return Err(EngineError::Config(
                "flusher.interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(EngineError::Config("logging.level cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(EngineError::InvalidCapacity);
        }
        Ok(())
    }
}
