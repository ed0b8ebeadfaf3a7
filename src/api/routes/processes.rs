//! Run progress handlers.

use super::CancelResponse;
use crate::api::AppState;
use crate::error::ApiError;
use crate::types::RunId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

fn parse_run_id(raw: &str) -> Result<RunId, Response> {
    raw.parse::<RunId>().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::validation(format!("invalid run id '{}': {}", raw, e))),
        )
            .into_response()
    })
}

/// GET /processes - List every run, oldest first
#[utoipa::path(
    get,
    path = "/processes",
    tag = "processes",
    responses(
        (status = 200, description = "Tracker entries of all runs", body = Vec<crate::types::ProcessInfo>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_processes(State(state): State<AppState>) -> Response {
    match state.publisher.processes().await {
        Ok(processes) => (StatusCode::OK, Json(processes)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list processes");
            e.into_response()
        }
    }
}

/// GET /processes/:id - Progress of one run
#[utoipa::path(
    get,
    path = "/processes/{id}",
    tag = "processes",
    params(
        ("id" = String, Path, description = "Run ID (UUID)")
    ),
    responses(
        (status = 200, description = "Tracker entry", body = crate::types::ProcessInfo),
        (status = 400, description = "Malformed run ID", body = crate::error::ApiError),
        (status = 404, description = "Run not found", body = crate::error::ApiError)
    )
)]
pub async fn get_process(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_run_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.publisher.process(id).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /processes/:id/cancel - Request cancellation of a run
#[utoipa::path(
    post,
    path = "/processes/{id}/cancel",
    tag = "processes",
    params(
        ("id" = String, Path, description = "Run ID (UUID)")
    ),
    responses(
        (status = 202, description = "Cancellation requested", body = CancelResponse),
        (status = 400, description = "Malformed run ID", body = crate::error::ApiError),
        (status = 404, description = "Run not found", body = crate::error::ApiError),
        (status = 409, description = "Run already finished, errored or cancelled", body = crate::error::ApiError)
    )
)]
pub async fn cancel_process(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_run_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.publisher.cancel(id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(CancelResponse {
                id,
                status: "cancellation_requested".into(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(run_id = %id, error = %e, "Cancel rejected");
            e.into_response()
        }
    }
}
