//! Webhook endpoint
//!
//! Acknowledges each update immediately and handles it on its own task, so
//! a slow pack mutation never delays the platform's delivery queue.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::services::handle_update;
use crate::telegram::types::Update;
use crate::AppState;

/// POST {webhook_path}
pub async fn receive_update(
    State(state): State<AppState>,
    payload: Result<Json<Update>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(update) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Rejected malformed webhook payload");
        ApiError::BadRequest(rejection.body_text())
    })?;

    tracing::debug!(update_id = update.update_id, "Webhook update received");

    tokio::spawn(async move {
        handle_update(&state, update).await;
    });

    Ok(StatusCode::OK)
}

pub fn webhook_routes(path: &str) -> Router<AppState> {
    Router::new().route(path, post(receive_update))
}
