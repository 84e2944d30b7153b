use super::state::AppState;
use crate::session::{RecorderStatus, StopOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::error;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub delivery: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<crate::delivery::SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_url: Option<String>,
    pub status: RecorderStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recorder/start
/// Arm the microphone and begin capturing. Inert if already recording.
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.recorder.start().await {
        Ok(()) => (StatusCode::OK, Json(state.recorder.status())).into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /recorder/stop
/// Stop capturing and run the encode/deliver pipeline to completion.
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.recorder.stop().await {
        Ok(outcome) => {
            let status = state.recorder.status();
            let body = match outcome {
                StopOutcome::Ignored => StopResponse {
                    delivery: "none",
                    reason: None,
                    uploaded_url: None,
                    status,
                },
                StopOutcome::Skipped(reason) => StopResponse {
                    delivery: "skipped",
                    reason: Some(reason),
                    uploaded_url: None,
                    status,
                },
                StopOutcome::Delivered(result) => StopResponse {
                    delivery: "delivered",
                    reason: None,
                    uploaded_url: Some(result.uploaded_url),
                    status,
                },
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            error!("Failed to finalize recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to finalize recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /recorder/status
/// Current state and elapsed seconds.
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.recorder.status()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
