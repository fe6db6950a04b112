//! Filesystem backend for itemflow item storage.
//!
//! Stores each item as `data/items/<id>.yml` under the workspace root, with
//! workspace settings in `.itemflow/config.yml`.

pub mod config;
pub mod error;
pub mod workspace;

pub use config::{ProcessingSettings, WorkspaceConfig};
pub use error::{FsError, Result};
pub use workspace::{ItemFilter, Workspace};
