//! REST API Server for the Loan Desk Orchestrator
//!
//! Exposes the turn loop via HTTP endpoints
//! One POST per human turn, threads addressed by caller-supplied id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::agent::Orchestrator;
use crate::error::OrchestrationError;
use crate::models::ThreadId;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted on the first turn, a fresh thread id is minted and returned.
    pub thread_id: Option<String>,
    pub message: String,
}

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
    pub orchestrator: Arc<Orchestrator>,
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
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let thread_id = match req.thread_id.as_deref() {
        Some(id) if !id.trim().is_empty() => ThreadId::new(id),
        _ => ThreadId::new(uuid::Uuid::new_v4().to_string()),
    };

    info!(thread_id = %thread_id, "Received chat turn");

    match state.orchestrator.run_turn(&thread_id, &req.message).await {
        Ok(outcome) => {
            let reply = outcome.reply().unwrap_or_default().to_string();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "thread_id": outcome.thread_id,
                    "reply": reply,
                    "messages": outcome.new_messages,
                }))),
            )
        }
        Err(OrchestrationError::DecisionUnavailable(detail)) => {
            warn!(thread_id = %thread_id, detail = %detail, "Decision capability unavailable");
            // Nothing was persisted, the caller can resend the same turn.
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::error(
                    "The assistant is temporarily unavailable. Please resend your message.".into(),
                )),
            )
        }
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "Turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Orchestration failed".into())),
            )
        }
    }
}

/// =============================
/// Thread Transcript Endpoint
/// =============================

async fn thread_handler(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let thread_id = ThreadId::new(thread_id);

    match state.orchestrator.history(&thread_id).await {
        Ok(messages) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "thread_id": thread_id,
                "messages": messages,
            }))),
        ),
        Err(OrchestrationError::InvalidThreadState(_)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Thread not found".into())),
        ),
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "Failed to load thread");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Failed to load thread".into())),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/thread/:thread_id", get(thread_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
