//! HTTP request handlers

use super::sse::reply_stream;
use super::types::{ErrorResponse, MessageRequest, QueuedResponse, SelectRequest};
use super::AppState;
use crate::state_machine::{Command, Event};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions/:user_id/message", post(send_message))
        .route("/api/sessions/:user_id/select", post(send_select))
        .route("/api/sessions/:user_id/stream", get(stream_session))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Inbound Dispatch
// ============================================================

/// Decode free text into the event it represents: a slash command, a main
/// menu label, or plain text.
fn parse_inbound(text: &str) -> Event {
    let trimmed = text.trim();
    if let Some(command) = trimmed
        .strip_prefix('/')
        .and_then(Command::parse)
        .or_else(|| Command::from_menu_label(trimmed))
    {
        Event::Command(command)
    } else {
        Event::Text {
            text: trimmed.to_string(),
        }
    }
}

async fn send_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let event = parse_inbound(&req.text);
    state
        .manager
        .send_event(&user_id, req.username.as_deref(), event)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn send_select(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let event = Event::Selection {
        action: req.action,
        subject: req.subject,
    };
    state
        .manager
        .send_event(&user_id, req.username.as_deref(), event)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(QueuedResponse { queued: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let rx = state.manager.subscribe(&user_id).await;
    reply_stream(rx)
}

async fn get_version() -> &'static str {
    concat!("tutorbot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
