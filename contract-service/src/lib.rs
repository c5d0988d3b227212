pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use service_core::middleware::request_id_middleware;

use config::Config;
use services::{BalanceService, ContractEditor, ContractStore, WebhookEmitter};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: ContractStore,
    pub emitter: Arc<WebhookEmitter>,
    pub balances: BalanceService,
    pub editor: Arc<ContractEditor>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Customer endpoints
        .route("/customers", post(handlers::customers::create_customer))
        .route("/customers/:id", get(handlers::customers::get_customer))
        .route("/customers/:id/balance", post(handlers::balances::set_balance))
        // Contract endpoints
        .route("/contracts", post(handlers::contracts::create_contract))
        .route("/contracts/edit", post(handlers::contracts::edit_contract))
        .route("/contracts/:id", get(handlers::contracts::get_contract))
        // Event delivery targets
        .route("/webhooks", post(handlers::webhooks::register_webhook))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}
