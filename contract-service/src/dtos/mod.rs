//! Request/response DTOs for the contract emulator API.
//!
//! Request bodies are explicit typed structs with required vs. optional
//! fields spelled out; they are validated before any domain entity is
//! constructed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::models::{BillingFrequency, PaymentGateStatus};

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContractRequest {
    #[validate(length(min = 1))]
    pub customer_id: String,
    pub starting_at: DateTime<Utc>,
    pub uniqueness_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetBalanceRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterWebhookRequest {
    #[validate(length(min = 1))]
    pub url: String,
}

/// Incremental contract edit. Lists apply in the fixed order documented on
/// the edit processor; empty lists are no-ops.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditContractRequest {
    #[validate(length(min = 1))]
    pub contract_id: String,
    #[validate(length(min = 1))]
    pub customer_id: String,
    pub uniqueness_key: Option<String>,
    #[serde(default)]
    pub update_subscriptions: Vec<UpdateSubscription>,
    #[serde(default)]
    pub update_recurring_credits: Vec<UpdateRecurringCredit>,
    #[serde(default)]
    pub archive_credits: Vec<ArchiveCredit>,
    #[serde(default)]
    pub add_subscriptions: Vec<AddSubscription>,
    #[serde(default)]
    pub add_recurring_credits: Vec<AddRecurringCredit>,
    #[serde(default)]
    pub add_credits: Vec<AddCredit>,
    #[serde(default)]
    pub add_overrides: Vec<AddOverride>,
    pub update_prepaid_balance_threshold_configuration: Option<UpdateThresholdConfiguration>,
    pub add_prepaid_balance_threshold_configuration: Option<AddThresholdConfiguration>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscription {
    pub subscription_id: String,
    pub ending_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecurringCredit {
    pub recurring_credit_id: String,
    pub ending_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveCredit {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSubscription {
    /// Honored as the created subscription's id, so later entries in the same
    /// edit can address it.
    pub temporary_id: Option<String>,
    pub starting_at: DateTime<Utc>,
    pub subscription_rate: SubscriptionRateInput,
    pub initial_quantity: Option<i64>,
    pub custom_fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRateInput {
    pub product_id: String,
    pub billing_frequency: BillingFrequency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    pub subscription_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddRecurringCredit {
    pub product_id: String,
    pub starting_at: DateTime<Utc>,
    pub subscription_config: Option<SubscriptionConfig>,
}

#[derive(Debug, Deserialize)]
pub struct AddCredit {
    pub product_id: String,
    pub access_schedule: Option<AccessScheduleInput>,
    pub subscription_config: Option<SubscriptionConfig>,
    pub custom_fields: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct AccessScheduleInput {
    pub credit_type_id: Option<String>,
    #[serde(default)]
    pub schedule_items: Vec<ScheduleItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleItemInput {
    pub starting_at: DateTime<Utc>,
    pub ending_before: DateTime<Utc>,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AddOverride {
    pub product_id: String,
    pub starting_at: DateTime<Utc>,
    pub entitled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdCommitInput {
    pub product_id: String,
    #[serde(default)]
    pub applicable_product_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddThresholdConfiguration {
    pub is_enabled: bool,
    pub threshold_amount: Decimal,
    pub recharge_to_amount: Decimal,
    pub payment_gate_config: Option<serde_json::Value>,
    pub commit: Option<ThresholdCommitInput>,
    pub mock_payment_status: Option<PaymentGateStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThresholdConfiguration {
    pub is_enabled: Option<bool>,
    pub threshold_amount: Option<Decimal>,
    pub recharge_to_amount: Option<Decimal>,
    pub payment_gate_config: Option<serde_json::Value>,
    pub commit: Option<ThresholdCommitInput>,
}

#[derive(Debug, Serialize)]
pub struct EditContractResponse {
    pub id: String,
}
