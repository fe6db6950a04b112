//! Persistence contract consumed by the batch processor.

use crate::item::{Item, ItemId};
use async_trait::async_trait;

/// Error returned by a persistence backend.
///
/// Boxed so any backend can report its own error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Storage operations needed to process items.
///
/// Implementations own their internal consistency. Callers guarantee that a
/// single batch never fetches and saves the same id from two tasks at once.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Snapshot of every stored id, in storage order.
    async fn list_ids(&self) -> Result<Vec<ItemId>, StoreError>;

    /// Fetch an item; `Ok(None)` when no item has this id.
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Persist an item and return the stored representation.
    async fn save(&self, item: Item) -> Result<Item, StoreError>;
}
