//! Concurrent batch processing for itemflow.
//!
//! `BatchProcessor::process_all` snapshots every stored id, runs one unit of
//! work per id on a bounded `WorkerPool`, waits for all of them and folds the
//! outcomes in dispatch order:
//!
//! - a missing item is skipped,
//! - any failed unit fails the whole batch with that unit's id,
//! - otherwise the processed items are returned in snapshot order.

pub mod config;
pub mod error;
pub mod outcome;
pub mod pool;
pub mod processor;

#[cfg(test)]
mod mock;

pub use config::ProcessorConfig;
pub use error::{BatchError, ItemError};
pub use outcome::{BatchResult, ItemOutcome};
pub use pool::WorkerPool;
pub use processor::{BatchHandle, BatchProcessor};
pub use tokio_util::sync::CancellationToken;
