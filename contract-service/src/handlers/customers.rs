//! Customer handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use service_core::error::AppError;

use crate::{dtos::CreateCustomerRequest, models::Customer, AppState};

/// Create a customer.
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = Customer {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        balances: BTreeMap::new(),
        created_at: Utc::now(),
    };

    if state.store.customer(&customer.id).is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Customer {} already exists",
            customer.id
        )));
    }

    tracing::info!(customer_id = %customer.id, "Creating customer");
    state.store.insert_customer(customer.clone());

    Ok((StatusCode::CREATED, Json(customer)))
}

/// Get a customer by id, including prepaid balances.
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .store
        .customer(&customer_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer {} not found", customer_id)))?;

    Ok(Json(customer))
}
