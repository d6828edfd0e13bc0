//! HTTP surface of the service.
//!
//! - `POST /ai-command` runs one generation request
//! - `GET /health` is a liveness probe
//!
//! Pipeline outcomes, including provider failures and rejected code, are
//! always HTTP 200 with the diagnostic in `code`. Only a request body that
//! cannot be parsed or a panic inside a handler produce HTTP 500.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::ServiceConfig;
use crate::error::{ProviderError, Result};
use crate::generator::{CodeGenerator, GenerationOutcome, GenerationRequest};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    generator: Arc<CodeGenerator>,
}

impl AppState {
    pub fn new(generator: Arc<CodeGenerator>) -> Self {
        Self { generator }
    }
}

/// Body of `POST /ai-command`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiCommandRequest {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub instruction: String,
    /// Falls back to the configured default provider when absent.
    #[serde(default)]
    pub api_provider: Option<String>,
}

/// Successful response of `POST /ai-command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiCommandResponse {
    pub status: String,
    pub code: String,
    pub api_used: String,
    /// Which pipeline outcome produced `code`.
    pub outcome: String,
    /// `{code, message}` of the failed provider call, for `provider_failure`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderError>,
}

impl AiCommandResponse {
    /// Response body for a finished pipeline run.
    pub fn from_outcome(outcome: &GenerationOutcome, api_used: String) -> Self {
        Self {
            status: "success".to_string(),
            code: outcome.to_code(),
            api_used,
            outcome: outcome.kind().to_string(),
            error: outcome.provider_error().cloned(),
        }
    }
}

/// Handler-level failures, reported as HTTP 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidBody(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        let body = ErrorBody {
            status: "error",
            message: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        message: "Backend is running",
    })
}

/// `POST /ai-command`
pub async fn ai_command(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AiCommandRequest>, JsonRejection>,
) -> std::result::Result<Json<AiCommandResponse>, ApiError> {
    let Json(body) = payload?;

    let api_used = body
        .api_provider
        .unwrap_or_else(|| state.generator.default_provider().as_str().to_string());

    let request = GenerationRequest::new(body.context, body.instruction, api_used.clone());
    let outcome = state.generator.generate(&request).await;

    Ok(Json(AiCommandResponse::from_outcome(&outcome, api_used)))
}

fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

/// Build the router with both routes, permissive CORS and panic recovery.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ai-command", post(ai_command))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

/// Bind to the configured address and serve until the process exits.
pub async fn serve(config: &ServiceConfig) -> Result<()> {
    let generator = Arc::new(CodeGenerator::from_config(config)?);

    let configured = config.configured_providers();
    if configured.is_empty() {
        warn!("No provider API keys configured; every request will return a diagnostic");
    } else {
        info!(
            "Configured providers: {}",
            configured
                .iter()
                .map(|kind| kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let app = build_router(AppState::new(generator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
