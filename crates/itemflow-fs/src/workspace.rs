//! Workspace management and item operations.

use crate::config::WorkspaceConfig;
use crate::error::{FsError, Result};
use async_trait::async_trait;
use itemflow_core::{validate, Item, ItemId, ItemRepository, NewItem, StoreError};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Directory name for itemflow configuration.
const ITEMFLOW_DIR: &str = ".itemflow";
/// Configuration file name.
const CONFIG_FILE: &str = "config.yml";
/// Items directory name.
const ITEMS_DIR: &str = "data/items";
/// Extension of item files.
const ITEM_EXT: &str = "yml";

/// A workspace stores items on the filesystem.
#[derive(Debug)]
pub struct Workspace {
    /// Root path of the workspace.
    root: PathBuf,
    /// Workspace configuration.
    config: WorkspaceConfig,
    /// Serializes id allocation.
    create_lock: Mutex<()>,
    /// One lock per id, held across every write to that id.
    item_locks: std::sync::Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
    /// Makes temp file names unique within the process.
    tmp_seq: AtomicU64,
}

impl Workspace {
    /// Initialize a new workspace at the given path with default settings.
    ///
    /// # Errors
    /// Returns error if workspace already exists or IO fails.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        Self::init_with_config(path, WorkspaceConfig::default())
    }

    /// Initialize a new workspace at the given path with the given settings.
    ///
    /// # Errors
    /// Returns error if workspace already exists or IO fails.
    pub fn init_with_config(path: impl AsRef<Path>, config: WorkspaceConfig) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let itemflow_dir = root.join(ITEMFLOW_DIR);

        if itemflow_dir.exists() {
            return Err(FsError::WorkspaceExists(root));
        }

        fs::create_dir_all(&itemflow_dir)?;
        fs::create_dir_all(root.join(ITEMS_DIR))?;

        let config_content = serde_yaml::to_string(&config)?;
        fs::write(itemflow_dir.join(CONFIG_FILE), config_content)?;

        info!(path = %root.display(), "Initialized workspace");

        Ok(Self::from_parts(root, config))
    }

    /// Open an existing workspace at the given path.
    ///
    /// # Errors
    /// Returns error if workspace doesn't exist or config is invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let config_path = root.join(ITEMFLOW_DIR).join(CONFIG_FILE);

        if !config_path.exists() {
            return Err(FsError::WorkspaceNotFound(root));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let config: WorkspaceConfig = serde_yaml::from_str(&config_content)?;

        debug!(path = %root.display(), "Opened workspace");

        Ok(Self::from_parts(root, config))
    }

    fn from_parts(root: PathBuf, config: WorkspaceConfig) -> Self {
        Self {
            root,
            config,
            create_lock: Mutex::new(()),
            item_locks: std::sync::Mutex::new(HashMap::new()),
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// Get the workspace root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the workspace configuration.
    #[must_use]
    pub const fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    fn items_dir(&self) -> PathBuf {
        self.root.join(ITEMS_DIR)
    }

    fn item_path(&self, id: ItemId) -> PathBuf {
        self.items_dir().join(format!("{id}.{ITEM_EXT}"))
    }

    async fn lock_item(&self, id: ItemId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .item_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Create a new item, assigning the next free id.
    ///
    /// # Errors
    /// Returns error if the payload is invalid or IO fails.
    pub async fn create_item(&self, payload: NewItem) -> Result<Item> {
        validate(&payload)?;

        let _guard = self.create_lock.lock().await;
        let next_id = self
            .item_ids()
            .await?
            .last()
            .copied()
            .map_or(Ok(ItemId(1)), ItemId::next)?;

        let item = payload.into_item(next_id);
        let _item_guard = self.lock_item(item.id).await;
        self.write_item(&item).await?;

        info!(id = %item.id, name = %item.name, "Created item");

        Ok(item)
    }

    /// Get an item by id.
    ///
    /// # Errors
    /// Returns `FsError::ItemNotFound` if no item has this id.
    pub async fn get_item(&self, id: ItemId) -> Result<Item> {
        self.read_item(id).await?.ok_or(FsError::ItemNotFound(id))
    }

    /// List items in ascending id order, optionally filtered.
    ///
    /// # Errors
    /// Returns error if the items directory cannot be read.
    pub async fn list_items(&self, filter: Option<&ItemFilter>) -> Result<Vec<Item>> {
        let mut items = Vec::new();

        for id in self.item_ids().await? {
            match self.read_item(id).await {
                Ok(Some(item)) => {
                    if filter.is_none_or(|f| f.matches(&item)) {
                        items.push(item);
                    }
                }
                // Deleted between listing and reading.
                Ok(None) => {}
                Err(e) => {
                    debug!(id = %id, error = %e, "Failed to read item, skipping");
                }
            }
        }

        Ok(items)
    }

    /// Replace the editable fields of an item.
    ///
    /// # Errors
    /// Returns error if the payload is invalid or the item doesn't exist.
    pub async fn update_item(&self, id: ItemId, payload: NewItem) -> Result<Item> {
        validate(&payload)?;

        let _guard = self.lock_item(id).await;
        let mut item = self.get_item(id).await?;
        payload.apply_to(&mut item);
        self.write_item(&item).await?;

        info!(id = %id, "Updated item");

        Ok(item)
    }

    /// Delete an item.
    ///
    /// # Errors
    /// Returns `FsError::ItemNotFound` if no item has this id.
    pub async fn delete_item(&self, id: ItemId) -> Result<()> {
        let _guard = self.lock_item(id).await;
        match tokio::fs::remove_file(self.item_path(id)).await {
            Ok(()) => {
                info!(id = %id, "Deleted item");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FsError::ItemNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every stored item, ascending.
    async fn item_ids(&self) -> Result<Vec<ItemId>> {
        let mut entries = match tokio::fs::read_dir(self.items_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ITEM_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<ItemId>() {
                Ok(id) => ids.push(id),
                Err(_) => debug!(file = %path.display(), "Ignoring unrecognized file"),
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    async fn read_item(&self, id: ItemId) -> Result<Option<Item>> {
        match tokio::fs::read_to_string(self.item_path(id)).await {
            Ok(content) => Ok(Some(serde_yaml::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a uniquely named temp file and rename it into place.
    /// Callers hold the item's lock.
    async fn write_item(&self, item: &Item) -> Result<()> {
        let path = self.item_path(item.id);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.items_dir().join(format!(
            "{}.{ITEM_EXT}.{}-{seq}.tmp",
            item.id,
            std::process::id()
        ));
        let content = serde_yaml::to_string(item)?;

        let written = match tokio::fs::write(&tmp_path, content).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for Workspace {
    async fn list_ids(&self) -> std::result::Result<Vec<ItemId>, StoreError> {
        Ok(self.item_ids().await?)
    }

    async fn find_by_id(&self, id: ItemId) -> std::result::Result<Option<Item>, StoreError> {
        Ok(self.read_item(id).await?)
    }

    async fn save(&self, mut item: Item) -> std::result::Result<Item, StoreError> {
        item.touch();
        let _guard = self.lock_item(item.id).await;
        self.write_item(&item).await?;
        debug!(id = %item.id, status = %item.status, "Saved item");
        Ok(item)
    }
}

/// Filter criteria for listing items.
#[derive(Debug, Default)]
pub struct ItemFilter {
    /// Filter by status.
    pub status: Option<String>,
}

impl ItemFilter {
    /// Check if an item matches this filter.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(status) = &self.status {
            if !item.status.eq_ignore_ascii_case(status) {
                return false;
            }
        }

        true
    }
}
