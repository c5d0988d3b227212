//! Customer model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Customer owning contracts and per-product prepaid balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    /// Prepaid balance per product id.
    #[serde(default)]
    pub balances: BTreeMap<String, Decimal>,
    pub created_at: DateTime<Utc>,
}
