//! Prepaid balance handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use service_core::error::AppError;

use crate::{dtos::SetBalanceRequest, AppState};

/// Set the customer's prepaid balance for a product. Fires a low-balance
/// alert for every contract whose enabled threshold the balance breaches.
pub async fn set_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(payload): Json<SetBalanceRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    tracing::info!(
        customer_id = %customer_id,
        product_id = %payload.product_id,
        amount = %payload.amount,
        "Setting balance"
    );

    state
        .balances
        .set_balance(&customer_id, &payload.product_id, payload.amount)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
