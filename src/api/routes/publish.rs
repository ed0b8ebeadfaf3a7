//! Publish trigger handlers.

use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /snapshot-uploader/upload-all - Publish every registered channel
#[utoipa::path(
    post,
    path = "/snapshot-uploader/upload-all",
    tag = "publish",
    responses(
        (status = 202, description = "Run created and queued", body = crate::types::ProcessInfo),
        (status = 400, description = "No channel is registered", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn upload_all(State(state): State<AppState>) -> Response {
    match state.publisher.publish_all().await {
        Ok(info) => (StatusCode::ACCEPTED, Json(info)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected publish of all channels");
            e.into_response()
        }
    }
}

/// POST /snapshot-uploader/upload-selected - Publish the given channels in order
#[utoipa::path(
    post,
    path = "/snapshot-uploader/upload-selected",
    tag = "publish",
    request_body(content = Vec<String>, description = "Channel names, published in the given order"),
    responses(
        (status = 202, description = "Run created and queued", body = crate::types::ProcessInfo),
        (status = 400, description = "Empty list or unknown channel", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn upload_selected(
    State(state): State<AppState>,
    Json(names): Json<Vec<String>>,
) -> Response {
    match state.publisher.publish(names).await {
        Ok(info) => (StatusCode::ACCEPTED, Json(info)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected publish of selected channels");
            e.into_response()
        }
    }
}

/// GET /snapshot-uploader/get-available-channels - Names of every registered channel
#[utoipa::path(
    get,
    path = "/snapshot-uploader/get-available-channels",
    tag = "publish",
    responses(
        (status = 200, description = "Channel names in registration order", body = Vec<String>)
    )
)]
pub async fn available_channels(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.publisher.available_channels())
}
