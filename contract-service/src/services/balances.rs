//! Customer prepaid balances and threshold alerts.

use anyhow::anyhow;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

use service_core::error::AppError;

use crate::services::events::EventEmitter;
use crate::services::metrics::record_low_balance_alert;
use crate::services::store::ContractStore;

/// Writes per-product balances and fires low-balance alerts for contracts
/// whose enabled threshold the new balance breaches.
#[derive(Clone)]
pub struct BalanceService {
    store: ContractStore,
    emitter: Arc<dyn EventEmitter>,
}

impl BalanceService {
    pub fn new(store: ContractStore, emitter: Arc<dyn EventEmitter>) -> Self {
        Self { store, emitter }
    }

    #[instrument(skip(self, amount), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn set_balance(
        &self,
        customer_id: &str,
        product_id: &str,
        amount: Decimal,
    ) -> Result<(), AppError> {
        let mut customer = self
            .store
            .customer(customer_id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Customer {} not found", customer_id)))?;

        customer.balances.insert(product_id.to_string(), amount);
        self.store.update_customer(customer);

        tracing::info!(amount = %amount, "Balance updated");

        for contract in self.store.contracts_for_customer(customer_id) {
            let Some(config) = &contract.prepaid_balance_threshold_configuration else {
                continue;
            };
            if !config.is_enabled || amount >= config.threshold_amount {
                continue;
            }
            // A commit scopes the threshold to its product.
            if let Some(commit) = &config.commit {
                if commit.product_id != product_id {
                    continue;
                }
            }

            tracing::info!(
                contract_id = %contract.id,
                threshold = %config.threshold_amount,
                remaining = %amount,
                "Prepaid balance below threshold"
            );
            record_low_balance_alert(customer_id);
            self.emitter
                .low_balance_alert(customer_id, &contract.id, config.threshold_amount, amount)
                .await;
        }

        Ok(())
    }
}
