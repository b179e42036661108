//! HTTP API Server
//!
//! Thin axum layer over the handlers: routing, extraction, CORS, and
//! the error-to-status mapping. Stream listings always answer 200 with
//! best-effort data; hard failures are reserved for invalid input and
//! identity lookups that miss.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use stream_engine::{Note, StreamError};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{self, ApiContext, ConfirmTipRequest};

/// HTTP API Server
pub struct HttpApiServer {
    context: Arc<ApiContext>,
}

/// `StreamError` carried through axum
struct ApiError(StreamError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StreamError::NotFound(_) => StatusCode::NOT_FOUND,
            StreamError::Expired(_) => StatusCode::GONE,
            StreamError::Invalid(_) => StatusCode::BAD_REQUEST,
            StreamError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            StreamError::CapacityExceeded => StatusCode::TOO_MANY_REQUESTS,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<StreamError> for ApiError {
    fn from(e: StreamError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainScope {
    #[serde(default)]
    chain_id: u64,
    #[serde(default)]
    token_id: Option<u64>,
    #[serde(default)]
    address: Option<String>,
}

impl HttpApiServer {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// Create the Axum router
    pub fn router(self) -> Router {
        // CORS layer to allow browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/api/notes/confirm", post(confirm_mint))
            .route("/api/notes/tip", post(confirm_tip))
            .route("/api/stream", get(list_stream))
            .route("/api/notes/:note_id", get(get_note))
            .route("/api/notes/:note_id/echoes", get(list_echoes))
            .route("/api/fees", get(get_fees))
            .route("/health", get(health))
            .layer(cors)
            .with_state(self.context)
    }

    /// Run the server
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP API server listening on {}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn confirm_mint(
    State(context): State<Arc<ApiContext>>,
    Json(note): Json<Note>,
) -> Result<Json<Note>, ApiError> {
    let note = handlers::confirm_mint(&context, note)?;
    Ok(Json(note))
}

async fn confirm_tip(
    State(context): State<Arc<ApiContext>>,
    Json(request): Json<ConfirmTipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    handlers::confirm_tip(&context, request)?;
    Ok(Json(json!({ "accepted": true })))
}

async fn list_stream(
    State(context): State<Arc<ApiContext>>,
    Query(scope): Query<ChainScope>,
) -> impl IntoResponse {
    Json(handlers::list_stream(&context, scope.chain_id).await)
}

async fn get_note(
    State(context): State<Arc<ApiContext>>,
    Path(note_id): Path<String>,
    Query(scope): Query<ChainScope>,
) -> Result<Json<Note>, ApiError> {
    let note = handlers::get_note(&context, &note_id, scope.chain_id, scope.token_id).await?;
    Ok(Json(note))
}

async fn list_echoes(
    State(context): State<Arc<ApiContext>>,
    Path(note_id): Path<String>,
    Query(scope): Query<ChainScope>,
) -> impl IntoResponse {
    Json(handlers::list_echoes(&context, &note_id, scope.chain_id).await)
}

async fn get_fees(
    State(context): State<Arc<ApiContext>>,
    Query(scope): Query<ChainScope>,
) -> Result<impl IntoResponse, ApiError> {
    let address = scope.address.unwrap_or_default();
    let quote = handlers::get_fees(&context, scope.chain_id, &address).await?;
    Ok(Json(quote))
}

async fn health() -> &'static str {
    "ok"
}
