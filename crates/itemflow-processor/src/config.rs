//! Processor configuration.

use std::time::Duration;

/// Default number of concurrently processed items.
pub const DEFAULT_WORKER_POOL_SIZE: usize = 10;

/// Default simulated work per item.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(100);

/// Settings for a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Maximum number of units in flight at once (at least 1).
    pub worker_pool_size: usize,
    /// Work performed by each unit before it touches storage.
    pub processing_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            processing_delay: DEFAULT_PROCESSING_DELAY,
        }
    }
}

impl ProcessorConfig {
    /// Create a config; a pool size of zero is raised to one.
    #[must_use]
    pub fn new(worker_pool_size: usize, processing_delay: Duration) -> Self {
        Self {
            worker_pool_size: worker_pool_size.max(1),
            processing_delay,
        }
    }

    /// Set the worker pool size; zero is raised to one.
    #[must_use]
    pub fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size.max(1);
        self
    }

    /// Set the per-item processing delay.
    #[must_use]
    pub const fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }
}
