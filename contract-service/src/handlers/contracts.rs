//! Contract handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::{
    dtos::{CreateContractRequest, CreatedResponse, EditContractRequest, EditContractResponse},
    models::Contract,
    services::{ContractEventKind, EventEmitter},
    AppState,
};

/// Create a contract for a customer. A supplied uniqueness key rejects
/// duplicate submissions with a conflict.
pub async fn create_contract(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    payload.validate()?;

    state.store.customer(&payload.customer_id).ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!(
            "Customer {} not found",
            payload.customer_id
        ))
    })?;

    if let Some(key) = &payload.uniqueness_key {
        if state.store.has_uniqueness_key(key) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Uniqueness key {} already registered",
                key
            )));
        }
    }

    let contract = Contract::new(
        Uuid::new_v4().to_string(),
        payload.customer_id,
        payload.starting_at,
        payload.uniqueness_key.clone(),
        Utc::now(),
    );

    tracing::info!(
        contract_id = %contract.id,
        customer_id = %contract.customer_id,
        "Creating contract"
    );

    if let Some(key) = &payload.uniqueness_key {
        state.store.add_uniqueness_key(key);
    }
    state.store.insert_contract(contract.clone());
    state
        .emitter
        .contract_event(&contract, ContractEventKind::Created)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: contract.id }),
    ))
}

/// Get a contract aggregate by id.
pub async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> Result<Json<Contract>, AppError> {
    let contract = state
        .store
        .contract(&contract_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract {} not found", contract_id)))?;

    Ok(Json(contract))
}

/// Apply one incremental edit to a contract.
pub async fn edit_contract(
    State(state): State<AppState>,
    Json(request): Json<EditContractRequest>,
) -> Result<Json<EditContractResponse>, AppError> {
    let outcome = state.editor.process(request).await?;
    Ok(Json(EditContractResponse { id: outcome.id }))
}
