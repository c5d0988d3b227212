//! Contract, payment-gate, and balance event delivery.
//!
//! Delivery is fire-and-forget: each registered target gets a spawned POST
//! with an HMAC-signed body. Failures are logged and never retried; emission
//! never blocks or fails the operation that produced the event.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde_json::json;
use std::sync::RwLock;
use uuid::Uuid;

use service_core::utils::signature::generate_signature;

use crate::models::{Contract, PaymentGateStatus};
use crate::services::metrics::record_event_emitted;

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractEventKind {
    Created,
    Updated,
}

impl ContractEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractEventKind::Created => "contract.created",
            ContractEventKind::Updated => "contract.updated",
        }
    }
}

/// Outbound notification sink for the edit processor and balance service.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn contract_event(&self, contract: &Contract, kind: ContractEventKind);

    async fn payment_gate_status(
        &self,
        customer_id: &str,
        contract_id: &str,
        status: PaymentGateStatus,
    );

    async fn low_balance_alert(
        &self,
        customer_id: &str,
        contract_id: &str,
        threshold: Decimal,
        remaining_balance: Decimal,
    );
}

/// Webhook fan-out emitter.
pub struct WebhookEmitter {
    client: Client,
    secret: Secret<String>,
    targets: RwLock<Vec<String>>,
}

impl WebhookEmitter {
    pub fn new(targets: Vec<String>, secret: Secret<String>) -> Self {
        Self {
            client: Client::new(),
            secret,
            targets: RwLock::new(targets),
        }
    }

    /// Add a delivery target at runtime.
    pub fn register_target(&self, url: String) {
        let mut targets = self.targets.write().expect("webhook target lock poisoned");
        if !targets.contains(&url) {
            tracing::info!(url = %url, "Registering webhook target");
            targets.push(url);
        }
    }

    fn dispatch(&self, event_type: &'static str, properties: serde_json::Value) {
        let payload = json!({
            "id": Uuid::new_v4().to_string(),
            "type": event_type,
            "properties": properties,
        });
        let body = payload.to_string();
        let timestamp = Utc::now().timestamp();

        let signature = match generate_signature(self.secret.expose_secret(), timestamp, &body) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(error = %e, event_type, "Failed to sign webhook payload");
                return;
            }
        };

        let targets = self
            .targets
            .read()
            .expect("webhook target lock poisoned")
            .clone();

        for target in targets {
            let client = self.client.clone();
            let body = body.clone();
            let signature = signature.clone();
            tokio::spawn(async move {
                let result = client
                    .post(&target)
                    .header("content-type", "application/json")
                    .header(TIMESTAMP_HEADER, timestamp)
                    .header(SIGNATURE_HEADER, &signature)
                    .body(body)
                    .send()
                    .await;

                match result {
                    Ok(response) if response.status().is_success() => {
                        record_event_emitted(event_type, "delivered");
                        tracing::debug!(target = %target, event_type, "Webhook delivered");
                    }
                    Ok(response) => {
                        record_event_emitted(event_type, "rejected");
                        tracing::warn!(
                            target = %target,
                            event_type,
                            status = %response.status(),
                            "Webhook target rejected event"
                        );
                    }
                    Err(e) => {
                        record_event_emitted(event_type, "failed");
                        tracing::warn!(target = %target, event_type, error = %e, "Webhook delivery failed");
                    }
                }
            });
        }
    }
}

#[async_trait]
impl EventEmitter for WebhookEmitter {
    async fn contract_event(&self, contract: &Contract, kind: ContractEventKind) {
        self.dispatch(
            kind.as_str(),
            json!({
                "contract_id": contract.id,
                "customer_id": contract.customer_id,
            }),
        );
    }

    async fn payment_gate_status(
        &self,
        customer_id: &str,
        contract_id: &str,
        status: PaymentGateStatus,
    ) {
        self.dispatch(
            "payment_gate.status_changed",
            json!({
                "customer_id": customer_id,
                "contract_id": contract_id,
                "status": status.as_str(),
            }),
        );
    }

    async fn low_balance_alert(
        &self,
        customer_id: &str,
        contract_id: &str,
        threshold: Decimal,
        remaining_balance: Decimal,
    ) {
        self.dispatch(
            "prepaid_balance.low",
            json!({
                "customer_id": customer_id,
                "contract_id": contract_id,
                "threshold": threshold,
                "remaining_balance": remaining_balance,
            }),
        );
    }
}
