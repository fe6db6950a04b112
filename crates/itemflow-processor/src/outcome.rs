//! Per-unit outcomes and the folded batch result.

use crate::error::{BatchError, ItemError};
use itemflow_core::{Item, ItemId};

/// Terminal state of one unit of work.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The item was marked processed and saved; holds the stored copy.
    Processed(Item),
    /// The item no longer exists.
    Skipped,
    /// The unit failed.
    Failed(ItemError),
}

/// Items processed by a successful batch, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    items: Vec<Item>,
    skipped: usize,
}

impl BatchResult {
    /// Fold settled outcomes, given in dispatch order.
    ///
    /// The first failure in dispatch order fails the batch. Slots left empty
    /// belong to ids that were never dispatched and only occur after a
    /// recorded failure.
    ///
    /// # Errors
    /// Returns `BatchError::Item` for the first failed unit.
    pub fn fold(
        outcomes: impl IntoIterator<Item = (ItemId, Option<ItemOutcome>)>,
    ) -> Result<Self, BatchError> {
        let mut result = Self::default();

        for (id, outcome) in outcomes {
            match outcome {
                Some(ItemOutcome::Processed(item)) => result.items.push(item),
                Some(ItemOutcome::Skipped) => result.skipped += 1,
                Some(ItemOutcome::Failed(source)) => return Err(BatchError::Item { id, source }),
                None => {}
            }
        }

        Ok(result)
    }

    /// Processed items in dispatch order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Take the processed items.
    #[must_use]
    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    /// Number of processed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no item was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of ids whose item had vanished.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}
