//! Error types for the filesystem backend.

use itemflow_core::ItemId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filesystem operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur in filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// Workspace not found at the specified path.
    #[error("workspace not found at '{0}'")]
    WorkspaceNotFound(PathBuf),

    /// Workspace already exists.
    #[error("workspace already exists at '{0}'")]
    WorkspaceExists(PathBuf),

    /// Item not found.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] itemflow_core::CoreError),
}
