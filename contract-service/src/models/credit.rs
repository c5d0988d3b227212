//! One-time and recurring credit models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TIER_ID_FIELD;

/// One access window `[starting_at, ending_before)` granting `amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub starting_at: DateTime<Utc>,
    pub ending_before: DateTime<Utc>,
    pub amount: Decimal,
}

/// Access schedule of a credit. Synthesized credits always carry exactly one
/// schedule item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessSchedule {
    pub credit_type_id: Option<String>,
    pub schedule_items: Vec<ScheduleItem>,
}

/// One-time, schedule-bound credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credit {
    pub id: String,
    pub product_id: String,
    pub access_schedule: AccessSchedule,
    pub archived_at: Option<DateTime<Utc>>,
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

impl Credit {
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn tier_id(&self) -> Option<&str> {
        self.custom_fields.get(TIER_ID_FIELD).map(String::as_str)
    }

    /// The single access window. Synthesized credits always have one item.
    pub fn schedule_item(&self) -> Option<&ScheduleItem> {
        self.access_schedule.schedule_items.first()
    }
}

/// Intent to credit a product every billing period. Carries no amount;
/// amounts come from paired one-time credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringCredit {
    pub id: String,
    pub product_id: String,
    /// Hour-floored start.
    pub starting_at: DateTime<Utc>,
    pub ending_before: Option<DateTime<Utc>>,
    pub subscription_id: Option<String>,
}
