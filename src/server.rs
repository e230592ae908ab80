//! HTTP server.
//!
//! Exposes schema inference and content vectorization as a JSON API for the
//! site-onboarding UI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/createSchema` | Infer and store a schema from an example payload |
//! | `POST` | `/writeWeaviate` | Write pre-built objects to the vector store |
//! | `POST` | `/writeSchema` | Create the content class in the vector store if missing |
//! | `POST` | `/vectorize` | Vectorize every content node of a registered site |
//! | `POST` | `/onboardSite` | Fetch a site's export, store its schema, and link it |
//! | `GET`  | `/checkWeaviate` | Vector-store readiness probe |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": "Request missing fields: siteId, cmsId, payload, createdBy", "code": "invalid-argument" }
//! ```
//!
//! Input errors are `400`, unknown sites `404`, everything else `500`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser UI can call
//! the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::db;
use crate::error::Error;
use crate::migrate;
use crate::models::{Site, SiteSchema};
use crate::progress::CollectingProgress;
use crate::schema_store::{create_schema, first_non_null, integral_id, CreateSchemaRequest};
use crate::sites;
use crate::source::SourceClient;
use crate::vector_store::{VectorStore, WeaviateStore};
use crate::vectorize::{
    write_objects, VectorizeOptions, VectorizeReport, WriteRequest, WriteResult,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    /// `None` when `[vector_store].url` is not configured.
    pub store: Option<Arc<dyn VectorStore>>,
    pub source: Arc<SourceClient>,
}

impl AppState {
    /// Build state from configuration: the vector store is constructed only
    /// when enabled.
    pub fn from_config(config: Config, pool: SqlitePool) -> crate::error::Result<Self> {
        let store: Option<Arc<dyn VectorStore>> = if config.vector_store.is_enabled() {
            Some(Arc::new(WeaviateStore::from_config(&config.vector_store)?))
        } else {
            None
        };
        let source = Arc::new(SourceClient::new(&config.source)?);
        Ok(Self {
            config: Arc::new(config),
            pool,
            store,
            source,
        })
    }

    fn store(&self) -> Result<&dyn VectorStore, AppError> {
        self.store
            .as_deref()
            .ok_or_else(|| AppError(Error::Internal("vector store is not configured".into())))
    }
}

/// Build the router with all routes and CORS applied.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/createSchema", post(handle_create_schema))
        .route("/writeWeaviate", post(handle_write_objects))
        .route("/writeSchema", post(handle_write_schema))
        .route("/vectorize", post(handle_vectorize))
        .route("/onboardSite", post(handle_onboard_site))
        .route("/checkWeaviate", get(handle_check_vector_store))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let state = AppState::from_config(config.clone(), pool)?;
    if state.store.is_none() {
        info!("vector store not configured; vectorization endpoints will fail");
    }
    let app = build_router(state);

    info!(addr = %bind_addr, "server listening");
    println!("cmsh server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: &'static str,
}

/// Wraps the crate error so handlers can use `?`.
struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(body)).into_response()
    }
}

/// Unparseable bodies and a missing JSON content type get the 400 envelope
/// instead of axum's plain-text rejection.
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError(Error::InvalidArgument(rejection.body_text())))
}

/// Bodies with the wrong shape get the same 400 envelope as missing fields.
fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError(Error::InvalidArgument(e.to_string())))
}

fn site_id_from(primary: Option<Value>, alternate: Option<Value>) -> Result<i64, AppError> {
    integral_id(first_non_null(primary, alternate).as_ref())
        .ok_or_else(|| AppError(Error::InvalidArgument("Request missing fields: siteId".into())))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /createSchema ============

#[derive(Serialize)]
struct CreateSchemaResponse {
    success: bool,
    message: &'static str,
    schema: SiteSchema,
}

async fn handle_create_schema(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateSchemaResponse>, AppError> {
    let request: CreateSchemaRequest = parse_body(json_body(payload)?)?;
    let schema = create_schema(&state.pool, request).await?;
    Ok(Json(CreateSchemaResponse {
        success: true,
        message: "Schema created",
        schema,
    }))
}

// ============ POST /writeWeaviate ============

#[derive(Serialize)]
struct WriteObjectsResponse {
    success: bool,
    message: String,
    results: Vec<WriteResult>,
}

async fn handle_write_objects(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WriteObjectsResponse>, AppError> {
    let request = WriteRequest::parse(json_body(payload)?)?;
    let store = state.store()?;
    let results = write_objects(store, request, &state.config.vector_store.class_name).await?;
    Ok(Json(WriteObjectsResponse {
        success: true,
        message: format!(
            "{} object(s) successfully written to Weaviate",
            results.len()
        ),
        results,
    }))
}

// ============ POST /writeSchema ============

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn handle_write_schema(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let class_name = &state.config.vector_store.class_name;
    let created = state.store()?.ensure_class(class_name).await?;
    let message = if created {
        format!("Schema created successfully for {} class.", class_name)
    } else {
        "Schema already exists.".to_string()
    };
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

// ============ GET /checkWeaviate ============

async fn handle_check_vector_store(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let ready = state
        .store()?
        .is_ready()
        .await
        .map_err(|e| Error::Internal(format!("Weaviate initialization failed: {}", e)))?;
    if !ready {
        return Err(Error::Internal("Weaviate initialization failed: not ready".into()).into());
    }
    Ok(Json(MessageResponse {
        success: true,
        message: "Weaviate is ready.".to_string(),
    }))
}

// ============ POST /vectorize ============

#[derive(Deserialize)]
struct SiteBody {
    #[serde(default)]
    site_id: Option<Value>,
    #[serde(default, rename = "siteId")]
    site_id_alt: Option<Value>,
    #[serde(default)]
    created_by: Option<String>,
    #[serde(default, rename = "createdBy")]
    created_by_alt: Option<String>,
}

#[derive(Serialize)]
struct VectorizeResponse {
    success: bool,
    #[serde(flatten)]
    report: VectorizeReport,
    progress: Vec<u8>,
}

async fn handle_vectorize(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<VectorizeResponse>, AppError> {
    let body: SiteBody = parse_body(json_body(payload)?)?;
    let site_id = site_id_from(body.site_id, body.site_id_alt)?;
    let store = state.store()?;

    let progress = CollectingProgress::new();
    let report = sites::vectorize_site(
        &state.pool,
        &state.source,
        store,
        &VectorizeOptions::from_config(&state.config.vector_store),
        site_id,
        &progress,
    )
    .await?;

    Ok(Json(VectorizeResponse {
        success: true,
        report,
        progress: progress.percents(),
    }))
}

// ============ POST /onboardSite ============

#[derive(Serialize)]
struct OnboardResponse {
    success: bool,
    site: Site,
    schema: SiteSchema,
}

async fn handle_onboard_site(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OnboardResponse>, AppError> {
    let body: SiteBody = parse_body(json_body(payload)?)?;
    let site_id = site_id_from(body.site_id, body.site_id_alt)?;
    let created_by = body
        .created_by
        .or(body.created_by_alt)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError(Error::InvalidArgument("Request missing fields: createdBy".into())))?;

    let (site, schema) =
        sites::onboard_site(&state.pool, &state.source, site_id, &created_by).await?;
    Ok(Json(OnboardResponse {
        success: true,
        site,
        schema,
    }))
}
