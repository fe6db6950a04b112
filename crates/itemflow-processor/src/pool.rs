//! Bounded worker pool shared by batch runs.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::info;

/// Fixed-capacity pool limiting how many units run at once.
///
/// Cloning is cheap and every clone shares the same capacity, so one pool can
/// be created at startup and handed to every processor. Call
/// [`WorkerPool::shutdown`] at teardown; later acquisitions fail.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

/// A slot in the pool, released when dropped.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

/// Returned by [`WorkerPool::acquire`] once the pool is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolClosed;

impl WorkerPool {
    /// Create a pool with `size` slots (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.clamp(1, Semaphore::MAX_PERMITS);
        info!(workers = size, "Created worker pool");
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Total number of slots.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held by a unit.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot.
    ///
    /// # Errors
    /// Returns `PoolClosed` if the pool was shut down.
    pub async fn acquire(&self) -> Result<WorkerSlot, PoolClosed> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map(|permit| WorkerSlot { _permit: permit })
            .map_err(|_| PoolClosed)
    }

    /// Stop handing out slots. Units already holding a slot run to completion.
    pub fn shutdown(&self) {
        if !self.slots.is_closed() {
            self.slots.close();
            info!(workers = self.size, "Worker pool shut down");
        }
    }

    /// Whether [`WorkerPool::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.slots.is_closed()
    }
}
