// Transaction Explorer - Web Server
// JSON API over the standardized datasets, plus upload + standardization

use anyhow::Context;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use transaction_explorer::{
    ranking_records, standardize_file, DatasetStore, ExplorerConfig, ExplorerError,
    PatternRegistry, Records, StatsReport,
};

/// Shared application state: configuration only, datasets are read per request
#[derive(Clone)]
struct ServerState {
    config: Arc<ExplorerConfig>,
}

impl ServerState {
    fn store(&self) -> DatasetStore {
        DatasetStore::new(&self.config.data_dir)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    output: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body `{ "error": ... }` with a status derived from the failure
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

fn status_for(err: &ExplorerError) -> StatusCode {
    match err {
        e if e.is_user_error() => StatusCode::BAD_REQUEST,
        ExplorerError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ExplorerError> for ApiError {
    fn from(err: ExplorerError) -> Self {
        Self {
            status: status_for(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        } else {
            warn!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Decode a URL-encoded dataset name and reject anything path-like
fn dataset_name(raw: &str) -> Result<String, ApiError> {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    DatasetStore::validate_name(&decoded)?;
    Ok(decoded)
}

/// Last path component of an uploaded file name, `None` when empty
fn upload_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /datasets - Standardized dataset names
async fn list_datasets(State(state): State<ServerState>) -> ApiResult<Vec<String>> {
    Ok(Json(state.store().list()?))
}

/// GET /data/:filename - The standardized table as stored
async fn get_data(State(state): State<ServerState>, Path(filename): Path<String>) -> ApiResult<Value> {
    let name = dataset_name(&filename)?;
    Ok(Json(state.store().load_value(&name)?))
}

/// GET /newtable/:filename and /ranking/:filename - Professionals ranking
async fn get_ranking(State(state): State<ServerState>, Path(filename): Path<String>) -> ApiResult<Records> {
    let name = dataset_name(&filename)?;
    let table = state.store().load(&name)?;
    Ok(Json(ranking_records(&table)?))
}

/// GET /stats/:filename - The five chart series
async fn get_stats(State(state): State<ServerState>, Path(filename): Path<String>) -> ApiResult<StatsReport> {
    let name = dataset_name(&filename)?;
    let table = state.store().load(&name)?;
    Ok(Json(StatsReport::compute(
        &table,
        state.config.time_basis,
        state.config.locale,
    )))
}

/// POST /upload - Save the `file` field, then standardize it into the data dir
async fn upload_file(State(state): State<ServerState>, mut multipart: Multipart) -> ApiResult<UploadResponse> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ExplorerError::Transport(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ExplorerError::Transport(e.to_string()))?;
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) = upload.ok_or_else(|| ApiError::bad_request("no file provided"))?;
    let file_name = upload_name(&file_name).ok_or_else(|| ApiError::bad_request("empty file name"))?;

    let path = state.config.upload_dir.join(&file_name);
    tokio::fs::write(&path, &bytes).await.map_err(ExplorerError::from)?;
    info!(file = %file_name, bytes = bytes.len(), "upload saved");

    let config = state.config.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let registry = PatternRegistry::from_dir(&config.patterns_dir)?;
        standardize_file(&path, &registry, &config.data_dir)
    })
    .await
    .map_err(|e| ExplorerError::Transport(e.to_string()))?
    .map_err(|e| ApiError {
        // any standardization failure is reported as a server error
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: e.to_string(),
    })?;

    Ok(Json(UploadResponse {
        message: "Transformed file created".to_string(),
        output: outcome.output,
    }))
}

fn router(state: ServerState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/datasets", get(list_datasets))
        .route("/data/:filename", get(get_data))
        .route("/newtable/:filename", get(get_ranking))
        .route("/ranking/:filename", get(get_ranking))
        .route("/stats/:filename", get(get_stats))
        .route("/upload", post(upload_file))
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    println!("🌐 Transaction Explorer - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = ExplorerConfig::load()?;
    config.ensure_dirs()?;
    println!("✓ Data directory: {}", config.data_dir.display());
    println!("✓ Patterns: {}", config.patterns_dir.display());

    let addr = config.bind_addr.clone();
    let state = ServerState {
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/datasets", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;
    Ok(())
}
