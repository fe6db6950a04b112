//! Item model.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an item that has not been through a batch run yet.
pub const STATUS_UNPROCESSED: &str = "UNPROCESSED";

/// Status written by the batch processor.
pub const STATUS_PROCESSED: &str = "PROCESSED";

/// Identifier assigned to an item by the persistence layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// The next id in sequence.
    ///
    /// # Errors
    /// Returns `CoreError::IdsExhausted` if this is the largest id.
    pub fn next(self) -> Result<Self, CoreError> {
        match self.0.checked_add(1) {
            Some(next) => Ok(Self(next)),
            None => Err(CoreError::IdsExhausted),
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidId(s.to_string()))
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A persisted record moved through the processing workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Unique identifier, assigned on creation.
    pub id: ItemId,

    /// Human-readable name.
    pub name: String,

    /// Free-form description.
    pub description: String,

    /// Current status (e.g., "UNPROCESSED", "PROCESSED").
    pub status: String,

    /// Contact email.
    pub email: String,

    /// Creation timestamp (ISO 8601 UTC).
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (ISO 8601 UTC).
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Create a new unprocessed item with the given id.
    #[must_use]
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        description: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            status: STATUS_UNPROCESSED.to_string(),
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Touch the `updated_at` timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Mark the item as processed.
    pub fn mark_processed(&mut self) {
        self.status = STATUS_PROCESSED.to_string();
    }

    /// Check whether the item carries the processed status.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.status == STATUS_PROCESSED
    }
}

/// Payload used to create or replace an item's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub email: String,
}

fn default_status() -> String {
    STATUS_UNPROCESSED.to_string()
}

impl NewItem {
    /// Build a payload with the default status.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            status: default_status(),
            email: email.into(),
        }
    }

    /// Override the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Materialize the payload as an item with the given id.
    #[must_use]
    pub fn into_item(self, id: ItemId) -> Item {
        Item::new(id, self.name, self.description, self.email).with_status(self.status)
    }

    /// Copy the editable fields onto an existing item, keeping its id and
    /// creation time.
    pub fn apply_to(self, item: &mut Item) {
        item.name = self.name;
        item.description = self.description;
        item.status = self.status;
        item.email = self.email;
        item.touch();
    }
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            status: item.status.clone(),
            email: item.email.clone(),
        }
    }
}
