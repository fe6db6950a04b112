//! CLI command implementations.

use crate::output::{self, ItemSummary, OutputFormat};
use anyhow::{Context, Result};
use console::style;
use itemflow_core::{ItemId, NewItem};
use itemflow_fs::{ItemFilter, Workspace, WorkspaceConfig};
use itemflow_processor::{BatchProcessor, ProcessorConfig, WorkerPool};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Initialize a new workspace.
pub fn init(path: &Path, name: Option<String>, format: OutputFormat) -> Result<()> {
    let config = name.map(WorkspaceConfig::new).unwrap_or_default();
    Workspace::init_with_config(path, config).context("Failed to initialize workspace")?;
    output::print_success(
        &format!("Initialized workspace at {}", path.display()),
        format,
    );
    Ok(())
}

/// Create a new item.
pub async fn new_item(
    path: &Path,
    name: String,
    description: String,
    email: String,
    status: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;

    let status = status.unwrap_or_else(|| ws.config().defaults.status.clone());
    let payload = NewItem::new(name, description, email).with_status(status);

    let item = ws
        .create_item(payload)
        .await
        .context("Failed to create item")?;

    output::print(&item, format);
    Ok(())
}

/// List items.
pub async fn list(path: &Path, status: Option<String>, format: OutputFormat) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;

    let filter = status.map(|status| ItemFilter {
        status: Some(status),
    });

    let items = ws
        .list_items(filter.as_ref())
        .await
        .context("Failed to list items")?;

    let summaries: Vec<ItemSummary> = items.iter().map(ItemSummary::from).collect();
    output::print_item_list(&summaries, format);

    Ok(())
}

/// Get an item by id.
pub async fn get(path: &Path, id: ItemId, format: OutputFormat) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    let item = ws.get_item(id).await.context("Failed to get item")?;

    output::print(&item, format);
    Ok(())
}

/// Field values given to `set`; unset fields keep their current value.
#[derive(Debug, Default)]
pub struct FieldChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
}

impl FieldChanges {
    fn apply(self, mut payload: NewItem) -> NewItem {
        if let Some(name) = self.name {
            payload.name = name;
        }
        if let Some(description) = self.description {
            payload.description = description;
        }
        if let Some(email) = self.email {
            payload.email = email;
        }
        if let Some(status) = self.status {
            payload.status = status;
        }
        payload
    }
}

/// Change fields of an item.
pub async fn set(
    path: &Path,
    id: ItemId,
    changes: FieldChanges,
    format: OutputFormat,
) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    let current = ws.get_item(id).await.context("Failed to get item")?;

    let payload = changes.apply(NewItem::from(&current));
    let item = ws
        .update_item(id, payload)
        .await
        .context("Failed to update item")?;

    output::print(&item, format);
    Ok(())
}

/// Delete an item.
pub async fn delete(path: &Path, id: ItemId, format: OutputFormat) -> Result<()> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    ws.delete_item(id).await.context("Failed to delete item")?;
    output::print_success(&format!("Deleted item {id}"), format);
    Ok(())
}

/// Run a batch over every item. Ctrl-C cancels the batch.
pub async fn process(
    path: &Path,
    workers: Option<usize>,
    delay_ms: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let ws = Arc::new(Workspace::open(path).context("Failed to open workspace")?);

    let settings = &ws.config().processing;
    let config = ProcessorConfig::new(
        workers.unwrap_or(settings.worker_pool_size),
        Duration::from_millis(delay_ms.unwrap_or(settings.delay_ms)),
    );

    let pool = WorkerPool::new(config.worker_pool_size);
    let processor = Arc::new(BatchProcessor::new(ws.clone(), pool.clone(), config));

    let shutdown = processor.shutdown_token().clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling batch");
            shutdown.cancel();
        }
    });

    let result = processor.spawn().await;
    interrupt.abort();
    pool.shutdown();

    let batch = result.context("Failed to process items")?;

    if matches!(format, OutputFormat::Human) {
        let mut summary = format!("Processed {} items", batch.len());
        if batch.skipped() > 0 {
            summary.push_str(&format!(" ({} skipped)", batch.skipped()));
        }
        println!("{}", style(summary).green().bold());
    }

    let summaries: Vec<ItemSummary> = batch.items().iter().map(ItemSummary::from).collect();
    output::print_item_list(&summaries, format);

    Ok(())
}
