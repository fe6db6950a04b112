//! Error types for batch processing.

use itemflow_core::{ItemId, StoreError};
use thiserror::Error;

/// Why a single unit of work failed.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The batch was cancelled while the unit was running or waiting.
    #[error("processing was cancelled")]
    Cancelled,

    /// The item could not be fetched.
    #[error("fetch failed: {0}")]
    Fetch(#[source] StoreError),

    /// The processed item could not be saved.
    #[error("save failed: {0}")]
    Persistence(#[source] StoreError),

    /// The worker pool was shut down before the unit could start.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The unit panicked.
    #[error("unit panicked: {0}")]
    Panicked(String),
}

/// Error returned to the caller of a batch run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A unit failed; the batch produced no result.
    #[error("error processing item with id {id}: {source}")]
    Item {
        id: ItemId,
        #[source]
        source: ItemError,
    },

    /// The id snapshot could not be taken.
    #[error("failed to list item ids: {0}")]
    Listing(#[source] StoreError),

    /// The worker pool was shut down before the batch started.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The spawned batch task did not finish normally.
    #[error("batch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BatchError {
    /// The id of the failing item, when a single item caused the failure.
    #[must_use]
    pub const fn item_id(&self) -> Option<ItemId> {
        match self {
            Self::Item { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Whether the failure came from cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Item {
                source: ItemError::Cancelled,
                ..
            }
        )
    }
}
