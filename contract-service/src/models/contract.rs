//! Contract aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Credit, PrepaidBalanceThresholdConfiguration, RecurringCredit, Subscription};

/// Per-product entitlement override. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOverride {
    pub id: String,
    pub product_id: String,
    pub starting_at: DateTime<Utc>,
    pub entitled: bool,
}

/// A customer's billing agreement: subscriptions, credits, recurring
/// credits, overrides, and the optional threshold configuration. The
/// contract exclusively owns all nested collections; entities are never
/// shared across contracts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub customer_id: String,
    pub starting_at: DateTime<Utc>,
    pub uniqueness_key: Option<String>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub credits: Vec<Credit>,
    #[serde(default)]
    pub recurring_credits: Vec<RecurringCredit>,
    #[serde(default)]
    pub overrides: Vec<ProductOverride>,
    pub prepaid_balance_threshold_configuration: Option<PrepaidBalanceThresholdConfiguration>,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn new(
        id: String,
        customer_id: String,
        starting_at: DateTime<Utc>,
        uniqueness_key: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id,
            starting_at,
            uniqueness_key,
            subscriptions: Vec::new(),
            credits: Vec::new(),
            recurring_credits: Vec::new(),
            overrides: Vec::new(),
            prepaid_balance_threshold_configuration: None,
            created_at,
        }
    }

    pub fn subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.iter().find(|s| s.id == id)
    }

    pub fn subscription_mut(&mut self, id: &str) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|s| s.id == id)
    }

    pub fn recurring_credit_mut(&mut self, id: &str) -> Option<&mut RecurringCredit> {
        self.recurring_credits.iter_mut().find(|rc| rc.id == id)
    }

    pub fn credit_mut(&mut self, id: &str) -> Option<&mut Credit> {
        self.credits.iter_mut().find(|c| c.id == id)
    }
}
