//! REST API server for the financial insight pipeline
//!
//! Thin HTTP collaborator: every analysis request is a single `Pipeline::run`.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::{Pipeline, PipelineStatus};

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Error that still carries a payload (e.g. partial pipeline state).
    pub fn error_with_data<T: Serialize>(message: String, data: T) -> Self {
        Self {
            data: serde_json::to_value(data).ok(),
            ..Self::error(message)
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
    pub user_ids: Arc<Vec<String>>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_users(State(state): State<ApiState>) -> Json<ApiResponse> {
    Json(ApiResponse::success(state.user_ids.as_ref()))
}

async fn analyze(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Please select a user ID.".into())),
        );
    }

    info!(user_id = %user_id, "Received analysis request");

    let report = state.pipeline.run(user_id).await;

    match &report.status {
        PipelineStatus::Done => (StatusCode::OK, Json(ApiResponse::success(&report))),
        PipelineStatus::Failed(failure) => {
            let message = format!(
                "Pipeline failed while {} ({}): {}",
                failure.stage, failure.kind, failure.reason
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error_with_data(message, &report)),
            )
        }
        PipelineStatus::Aborted { before } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error_with_data(
                format!("Pipeline aborted before {}", before),
                &report,
            )),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<Pipeline>, user_ids: Vec<String>) -> Router {
    let state = ApiState {
        pipeline,
        user_ids: Arc::new(user_ids),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/users", get(list_users))
        .route("/api/analyze", post(analyze))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<Pipeline>,
    user_ids: Vec<String>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline, user_ids);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
