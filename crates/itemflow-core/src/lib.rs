//! itemflow-core: Domain model and persistence contract for item processing.
//!
//! This crate provides:
//! - `Item`: The persisted record moved from `UNPROCESSED` to `PROCESSED`
//! - `NewItem`: Creation/update payload with field validation
//! - `ItemRepository`: The persistence collaborator consumed by the batch processor

pub mod error;
pub mod item;
pub mod repository;
pub mod validate;

pub use error::{CoreError, Result};
pub use item::{Item, ItemId, NewItem, STATUS_PROCESSED, STATUS_UNPROCESSED};
pub use repository::{ItemRepository, StoreError};
pub use validate::{is_valid_email, validate};
