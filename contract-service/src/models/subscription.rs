//! Subscription model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Custom-field key grouping subscriptions that represent the same service
/// level across a plan change.
pub const TIER_ID_FIELD: &str = "tier_id";

/// Billing frequency of a subscription rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingFrequency {
    Monthly,
    Annual,
}

impl BillingFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingFrequency::Monthly => "MONTHLY",
            BillingFrequency::Annual => "ANNUAL",
        }
    }

    /// Length of one billing period in calendar months.
    pub fn period_months(&self) -> i32 {
        match self {
            BillingFrequency::Monthly => 1,
            BillingFrequency::Annual => 12,
        }
    }
}

/// Product and billing-frequency rate descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRate {
    pub product_id: String,
    pub billing_frequency: BillingFrequency,
}

/// One half-open billing period `[starting_at, ending_before)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub starting_at: DateTime<Utc>,
    pub ending_before: DateTime<Utc>,
}

/// Snapshot of the current and next billing period boundaries.
///
/// Invariant: `current.ending_before == next.starting_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriods {
    pub current: BillingPeriod,
    pub next: BillingPeriod,
}

/// Quantity effective from a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityScheduleItem {
    pub starting_at: DateTime<Utc>,
    pub quantity: i64,
}

/// Subscription within a contract. Never physically removed; cancellation
/// sets `ending_before`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub starting_at: DateTime<Utc>,
    pub ending_before: Option<DateTime<Utc>>,
    pub subscription_rate: SubscriptionRate,
    pub quantity_schedule: Vec<QuantityScheduleItem>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
    pub billing_periods: BillingPeriods,
}

impl Subscription {
    /// Tier tag carried in custom fields, when present.
    pub fn tier_id(&self) -> Option<&str> {
        self.custom_fields.get(TIER_ID_FIELD).map(String::as_str)
    }

    /// Whether the subscription is serving the customer at `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.starting_at <= at && self.ending_before.map_or(true, |e| e > at)
    }
}
