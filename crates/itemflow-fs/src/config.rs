//! Workspace configuration.

use itemflow_core::STATUS_UNPROCESSED;
use serde::{Deserialize, Serialize};

/// Workspace configuration stored in `.itemflow/config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceSettings,

    /// Default values for new items.
    #[serde(default)]
    pub defaults: ItemDefaults,

    /// Batch processing settings.
    #[serde(default)]
    pub processing: ProcessingSettings,
}

const fn default_version() -> u32 {
    1
}

/// Workspace-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Workspace name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Default values for new items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDefaults {
    /// Status given to items created without one.
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    STATUS_UNPROCESSED.to_string()
}

impl Default for ItemDefaults {
    fn default() -> Self {
        Self {
            status: default_status(),
        }
    }
}

/// Settings for the batch processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Maximum number of items processed concurrently.
    #[serde(default = "default_worker_pool_size", alias = "workerPoolSize")]
    pub worker_pool_size: usize,

    /// Simulated per-item work, in milliseconds.
    #[serde(default = "default_delay_ms", alias = "delayMs")]
    pub delay_ms: u64,
}

const fn default_worker_pool_size() -> usize {
    10
}

const fn default_delay_ms() -> u64 {
    100
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            workspace: WorkspaceSettings::default(),
            defaults: ItemDefaults::default(),
            processing: ProcessingSettings::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Create a new config with the given workspace name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            workspace: WorkspaceSettings {
                name: Some(name.into()),
            },
            ..Default::default()
        }
    }
}
