//! Prepaid-balance threshold configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commit a threshold recharge applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCommit {
    pub product_id: String,
    #[serde(default)]
    pub applicable_product_tags: Vec<String>,
}

/// Rule triggering an automatic balance recharge and alert when a prepaid
/// balance falls below a floor. Replaced wholesale on "add", patched
/// field-by-field on "update".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaidBalanceThresholdConfiguration {
    pub is_enabled: bool,
    pub threshold_amount: Decimal,
    pub recharge_to_amount: Decimal,
    pub payment_gate_config: Option<serde_json::Value>,
    pub commit: Option<ThresholdCommit>,
}

/// Outcome of a mocked payment-gate charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateStatus {
    Paid,
    Failed,
}

impl PaymentGateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentGateStatus::Paid => "paid",
            PaymentGateStatus::Failed => "failed",
        }
    }
}
