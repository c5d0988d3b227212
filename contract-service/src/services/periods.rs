//! Billing period derivation.

use chrono::{DateTime, Utc};

use crate::models::{BillingFrequency, BillingPeriod, BillingPeriods};
use crate::services::time::{add_months, floor_to_hour, floor_to_month};

/// Derive the `{current, next}` billing period snapshot for a subscription
/// starting at `starting_at` with the given billing frequency.
pub fn billing_periods(starting_at: DateTime<Utc>, frequency: BillingFrequency) -> BillingPeriods {
    let months = frequency.period_months();

    let current_start = floor_to_hour(floor_to_month(starting_at));
    let current_end = floor_to_hour(add_months(floor_to_month(starting_at), months));
    let next_end = floor_to_hour(add_months(floor_to_month(current_end), months));

    BillingPeriods {
        current: BillingPeriod {
            starting_at: current_start,
            ending_before: current_end,
        },
        next: BillingPeriod {
            starting_at: current_end,
            ending_before: next_end,
        },
    }
}
