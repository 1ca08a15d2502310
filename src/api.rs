//! REST API server for the assistant orchestrator
//!
//! Exposes query submission, live execution status, and the capability
//! descriptor over HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::coordinator::ExecutionCoordinator;
use crate::error::OrchestrationError;
use crate::models::{Capability, QueryRequest, VoiceQueryRequest};

/// =============================
/// Response Wrapper
/// =============================

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
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<ExecutionCoordinator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Query Endpoints
/// =============================

async fn submit_query(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received query: {}", req.query);

    // A degraded answer is still an answer; only orchestration-level faults
    // surface as errors here.
    match state
        .coordinator
        .run(&req.query, req.voice_mode, req.include_debug_info)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Orchestration failed: {}", e))),
        ),
    }
}

async fn submit_voice_query(
    State(state): State<ApiState>,
    Json(req): Json<VoiceQueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let audio = match base64::engine::general_purpose::STANDARD.decode(&req.audio_base64) {
        Ok(audio) => audio,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid audio payload: {}", e))),
            );
        }
    };

    match state
        .coordinator
        .run_voice(&audio, req.voice_mode, req.include_debug_info)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(ApiResponse::success(response))),
        Err(OrchestrationError::SpeechError(message)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Transcription failed: {}", message))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Orchestration failed: {}", e))),
        ),
    }
}

/// =============================
/// Execution Status Endpoints
/// =============================

async fn get_execution_status(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.coordinator.sessions().get(session_id).await {
        Ok(session) => (StatusCode::OK, Json(ApiResponse::success(session))),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Session not found".to_string())),
        ),
    }
}

async fn delete_execution_status(
    State(state): State<ApiState>,
    Path(session_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.coordinator.sessions().delete(session_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "message": "Session cleaned up successfully"
            }))),
        ),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Session not found".to_string())),
        ),
    }
}

/// =============================
/// Capability Descriptor
/// =============================

async fn get_capabilities(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let available: Vec<serde_json::Value> = Capability::ALL
        .iter()
        .map(|capability| {
            serde_json::json!({
                "tag": capability.to_string(),
                "name": capability.display_name(),
                "description": capability.description(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "available_capabilities": available,
        "active_sessions": state.coordinator.sessions().active_count().await,
    }))
}

/// =============================
/// Router
/// =============================

pub fn create_router(coordinator: Arc<ExecutionCoordinator>) -> Router {
    let state = ApiState { coordinator };

    Router::new()
        .route("/health", get(health))
        .route("/intelligent/query", post(submit_query))
        .route("/intelligent/voice", post(submit_voice_query))
        .route(
            "/execution/status/:session_id",
            get(get_execution_status).delete(delete_execution_status),
        )
        .route("/agents/status", get(get_capabilities))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    coordinator: Arc<ExecutionCoordinator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(coordinator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
