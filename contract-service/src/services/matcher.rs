//! Recurring-credit identity matching.

use chrono::{DateTime, Utc};

use crate::models::RecurringCredit;
use crate::services::time::floor_to_hour;

/// Decide whether `existing` is the same active recurring credit as the
/// candidate `(product_id, normalized_start, subscription_id)` tuple,
/// evaluated at `reference`.
///
/// A bound and an unbound recurring credit are never the same, even for an
/// identical product and start. An ended recurring credit (ending at or
/// before the hour-floored reference) never matches.
pub fn matches_active(
    existing: &RecurringCredit,
    product_id: &str,
    normalized_start: DateTime<Utc>,
    subscription_id: Option<&str>,
    reference: DateTime<Utc>,
) -> bool {
    if existing.product_id != product_id {
        return false;
    }
    if floor_to_hour(existing.starting_at) != normalized_start {
        return false;
    }
    if existing.subscription_id.as_deref() != subscription_id {
        return false;
    }
    match existing.ending_before {
        Some(ending_before) => ending_before > floor_to_hour(reference),
        None => true,
    }
}
