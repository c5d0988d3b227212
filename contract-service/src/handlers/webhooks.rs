//! Webhook target registration.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use service_core::error::AppError;

use crate::{dtos::RegisterWebhookRequest, AppState};

/// Register an additional webhook delivery target.
pub async fn register_webhook(
    State(state): State<AppState>,
    Json(payload): Json<RegisterWebhookRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    state.emitter.register_target(payload.url);

    Ok(StatusCode::CREATED)
}
