//! Engine configuration.
//!
//! # Example
//!
//! ```
//! use emberkv::EngineConfig;
//! use std::time::Duration;
//!
//! let config = EngineConfig::default()
//!     .with_worker_count(4)
//!     .with_inbound_capacity(256)
//!     .with_sweep_interval(Duration::from_millis(500));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Default number of worker tasks
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Default capacity of each inbound channel
pub const DEFAULT_INBOUND_CAPACITY: usize = 100;

/// Default capacity of the shared processing channel
pub const DEFAULT_PROCESSING_CAPACITY: usize = 100;

/// Default sweeper polling interval when nothing is armed
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Errors returned by [`EngineConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("{0} capacity must be at least 1")]
    ZeroCapacity(&'static str),

    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
}

/// Sizing and timing for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name attached to the engine's logging span (default: "emberkv")
    pub service_name: String,
    /// Number of concurrent workers draining the processing channel
    pub worker_count: usize,
    /// Capacity of each of the set/get/delete inbound channels
    pub inbound_capacity: usize,
    /// Capacity of the shared processing channel
    pub processing_capacity: usize,
    /// How long the sweeper sleeps when no key is armed
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_name: "emberkv".to_string(),
            worker_count: DEFAULT_WORKER_COUNT,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            processing_capacity: DEFAULT_PROCESSING_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn with_processing_capacity(mut self, capacity: usize) -> Self {
        self.processing_capacity = capacity;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Checks that every size and interval is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("inbound"));
        }
        if self.processing_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("processing"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}
