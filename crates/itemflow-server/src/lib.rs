//! HTTP API for itemflow.
//!
//! Exposes item CRUD and the batch run over JSON. The server owns one worker
//! pool for its lifetime and shuts it down when it stops.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use itemflow_core::{Item, ItemId, NewItem};
use itemflow_fs::{FsError, ItemFilter, Workspace};
use itemflow_processor::{BatchProcessor, CancellationToken, ProcessorConfig, WorkerPool};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server state shared across handlers.
#[derive(Debug)]
pub struct AppState {
    workspace: Arc<Workspace>,
    processor: Arc<BatchProcessor>,
}

impl AppState {
    /// Build state from an opened workspace and a processor over it.
    #[must_use]
    pub const fn new(workspace: Arc<Workspace>, processor: Arc<BatchProcessor>) -> Self {
        Self {
            workspace,
            processor,
        }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/items", get(list_items).post(create_item))
        .route("/items/process", get(process_items))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server and block until it is stopped with Ctrl-C.
///
/// # Errors
/// Returns error if the workspace can't be opened, binding fails or the
/// server encounters an error.
pub async fn serve(workspace_path: &std::path::Path, host: &str, port: u16) -> Result<()> {
    let workspace = Arc::new(Workspace::open(workspace_path)?);
    let settings = &workspace.config().processing;
    let config = ProcessorConfig::new(
        settings.worker_pool_size,
        Duration::from_millis(settings.delay_ms),
    );

    let pool = WorkerPool::new(config.worker_pool_size);
    let shutdown = CancellationToken::new();
    let processor = Arc::new(
        BatchProcessor::new(workspace.clone(), pool.clone(), config)
            .with_shutdown(shutdown.clone()),
    );
    let app = router(Arc::new(AppState::new(workspace, processor)));

    let addr = format!("{host}:{port}");
    info!(address = %addr, "Starting item server");

    let listener = TcpListener::bind(&addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await;

    pool.shutdown();
    served?;

    Ok(())
}

// --- Request/Response types ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let filter = query.status.map(|status| ItemFilter {
        status: Some(status),
    });
    let items = state.workspace.list_items(filter.as_ref()).await?;
    Ok(Json(items))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let item = state.workspace.create_item(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>, AppError> {
    let item = state.workspace.get_item(id).await?;
    Ok(Json(item))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
    Json(payload): Json<NewItem>,
) -> Result<Json<Item>, AppError> {
    let item = state.workspace.update_item(id, payload).await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.workspace.delete_item(id).await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "message": format!("Item {id} deleted")
    })))
}

async fn process_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Item>>, AppError> {
    let result = state.processor.process_all().await?;
    Ok(Json(result.into_items()))
}

// --- Error handling ---

struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<FsError>() {
            Some(FsError::ItemNotFound(_)) => return StatusCode::NOT_FOUND,
            Some(FsError::Core(e)) if e.is_validation() => return StatusCode::BAD_REQUEST,
            _ => {}
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
