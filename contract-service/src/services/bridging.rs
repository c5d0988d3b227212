//! Credit bridging for mid-period subscription swaps.
//!
//! When a recurring credit is added for a future-dated subscription change,
//! the customer is still served under the old entitlement until the new
//! subscription takes over. The resolver locates the subscription that is
//! currently active for the same tier or product and upserts credits covering
//! the gap, so the customer is not under-credited during the transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::dtos::AddCredit;
use crate::models::{AccessSchedule, Contract, Credit, RecurringCredit, ScheduleItem, TIER_ID_FIELD};
use crate::services::matcher::matches_active;
use crate::services::metrics::record_bridge_credit;
use crate::services::time::{add_months, floor_to_hour, floor_to_month};

/// Inputs for one bridging attempt, taken from the recurring credit being
/// added and the surrounding edit request.
pub struct BridgeRequest<'a> {
    pub product_id: &'a str,
    /// Hour-floored start of the recurring credit.
    pub normalized_start: DateTime<Utc>,
    pub target_subscription_id: Option<&'a str>,
    /// Subscription ids referenced by `update_subscriptions` in this edit.
    pub ending_subscription_ids: &'a [String],
    pub add_credits: &'a [AddCredit],
    pub now: DateTime<Utc>,
}

/// Which lookup located the subscription receiving the bridge credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchStrategy {
    TargetIdActive,
    SameTierActive,
    TierRepreference,
    EndingSubscriptionActive,
    SameProductActive,
}

impl MatchStrategy {
    fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::TargetIdActive => "target_id_active",
            MatchStrategy::SameTierActive => "same_tier_active",
            MatchStrategy::TierRepreference => "tier_repreference",
            MatchStrategy::EndingSubscriptionActive => "ending_subscription_active",
            MatchStrategy::SameProductActive => "same_product_active",
        }
    }
}

/// One product worth of bridge work, carrying the amount and credit type of
/// the record that introduced the product.
#[derive(Debug, Clone)]
struct ProductContext {
    product_id: String,
    amount: Decimal,
    credit_type_id: Option<String>,
}

/// Desired state of one credit slot; `upsert_credit` reuses an existing
/// unarchived credit with the same product and period on the same
/// subscription-or-tier rather than duplicating it.
pub struct CreditUpsert {
    pub product_id: String,
    pub starting_at: DateTime<Utc>,
    pub ending_before: DateTime<Utc>,
    pub amount: Decimal,
    pub credit_type_id: Option<String>,
    pub subscription_id: Option<String>,
    pub tier_id: Option<String>,
}

fn same_slot(credit: &Credit, up: &CreditUpsert) -> bool {
    if credit.is_archived() || credit.product_id != up.product_id {
        return false;
    }
    let Some(item) = credit.schedule_item() else {
        return false;
    };
    if item.starting_at != up.starting_at || item.ending_before != up.ending_before {
        return false;
    }
    credit.subscription_id == up.subscription_id
        || (up.tier_id.is_some() && credit.tier_id() == up.tier_id.as_deref())
}

/// Apply the desired credit state, reusing an existing record when one
/// occupies the same slot. Returns the credit's id.
pub fn upsert_credit(contract: &mut Contract, up: CreditUpsert) -> String {
    if let Some(credit) = contract.credits.iter_mut().find(|c| same_slot(c, &up)) {
        if let Some(item) = credit.access_schedule.schedule_items.first_mut() {
            item.amount = up.amount;
        }
        if up.credit_type_id.is_some() {
            credit.access_schedule.credit_type_id = up.credit_type_id;
        }
        credit.subscription_id = up.subscription_id;
        if let Some(tier) = up.tier_id {
            credit
                .custom_fields
                .insert(TIER_ID_FIELD.to_string(), tier);
        }
        return credit.id.clone();
    }

    let mut custom_fields = BTreeMap::new();
    if let Some(tier) = up.tier_id {
        custom_fields.insert(TIER_ID_FIELD.to_string(), tier);
    }
    let credit = Credit {
        id: Uuid::new_v4().to_string(),
        product_id: up.product_id,
        access_schedule: AccessSchedule {
            credit_type_id: up.credit_type_id,
            schedule_items: vec![ScheduleItem {
                starting_at: up.starting_at,
                ending_before: up.ending_before,
                amount: up.amount,
            }],
        },
        archived_at: None,
        subscription_id: up.subscription_id,
        custom_fields,
    };
    let id = credit.id.clone();
    contract.credits.push(credit);
    id
}

fn has_credit_in_slot(contract: &Contract, up: &CreditUpsert) -> bool {
    contract.credits.iter().any(|c| same_slot(c, up))
}

/// Create the recurring-credit record for `(product, start, target)` unless
/// an active one already exists.
fn ensure_recurring_credit(
    contract: &mut Contract,
    product_id: &str,
    normalized_start: DateTime<Utc>,
    target_subscription_id: &str,
) {
    let exists = contract.recurring_credits.iter().any(|rc| {
        matches_active(
            rc,
            product_id,
            normalized_start,
            Some(target_subscription_id),
            normalized_start,
        )
    });
    if !exists {
        contract.recurring_credits.push(RecurringCredit {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            starting_at: normalized_start,
            ending_before: None,
            subscription_id: Some(target_subscription_id.to_string()),
        });
    }
}

fn tier_of(contract: &Contract, subscription_id: &str) -> Option<String> {
    contract
        .subscription(subscription_id)
        .and_then(|s| s.tier_id().map(str::to_string))
}

fn target_id_active(contract: &Contract, target_id: &str, now: DateTime<Utc>) -> Option<String> {
    contract
        .subscription(target_id)
        .filter(|s| s.is_active_at(now))
        .map(|s| s.id.clone())
}

/// Same-tier active subscription, preferring one already mid-cancellation
/// (an end date set) over one without. `exclude` skips the target itself
/// when hunting for an alternative.
fn same_tier_active(
    contract: &Contract,
    tier: Option<&str>,
    now: DateTime<Utc>,
    exclude: Option<&str>,
) -> Option<String> {
    let tier = tier?;
    let mut fallback = None;
    for sub in &contract.subscriptions {
        if Some(sub.id.as_str()) == exclude {
            continue;
        }
        if sub.tier_id() != Some(tier) || !sub.is_active_at(now) {
            continue;
        }
        if sub.ending_before.is_some() {
            return Some(sub.id.clone());
        }
        if fallback.is_none() {
            fallback = Some(sub.id.clone());
        }
    }
    fallback
}

fn ending_subscription_active(
    contract: &Contract,
    ending_ids: &[String],
    now: DateTime<Utc>,
) -> Option<String> {
    ending_ids
        .iter()
        .find(|id| {
            contract
                .subscription(id)
                .is_some_and(|s| s.is_active_at(now))
        })
        .cloned()
}

fn same_product_active(
    contract: &Contract,
    product_id: &str,
    now: DateTime<Utc>,
) -> Option<String> {
    contract
        .subscriptions
        .iter()
        .find(|s| s.subscription_rate.product_id == product_id && s.is_active_at(now))
        .map(|s| s.id.clone())
}

/// Prioritized lookup for the subscription that should receive the bridge
/// credit. Strategies run in order and stop at the first hit; a same-tier
/// alternative then outranks a literal self-match once the tier is known.
fn find_matching_subscription(
    contract: &Contract,
    req: &BridgeRequest<'_>,
    target_id: &str,
) -> Option<(String, MatchStrategy)> {
    let now = req.now;
    let target_tier = tier_of(contract, target_id);
    let target_product = contract
        .subscription(target_id)
        .map(|s| s.subscription_rate.product_id.clone())
        .unwrap_or_else(|| req.product_id.to_string());

    let mut hit = target_id_active(contract, target_id, now)
        .map(|id| (id, MatchStrategy::TargetIdActive))
        .or_else(|| {
            same_tier_active(contract, target_tier.as_deref(), now, None)
                .map(|id| (id, MatchStrategy::SameTierActive))
        })
        .or_else(|| {
            ending_subscription_active(contract, req.ending_subscription_ids, now)
                .map(|id| (id, MatchStrategy::EndingSubscriptionActive))
        })
        .or_else(|| {
            same_product_active(contract, &target_product, now)
                .map(|id| (id, MatchStrategy::SameProductActive))
        });

    if let Some((id, _)) = &hit {
        if id == target_id {
            if let Some(alternative) =
                same_tier_active(contract, target_tier.as_deref(), now, Some(target_id))
            {
                hit = Some((alternative, MatchStrategy::TierRepreference));
            }
        }
    }

    hit
}

/// Products to bridge: the triggering product, every product of an
/// `add_credits` entry carrying a schedule item, and every product of an
/// existing unarchived credit on the matching subscription or its tier.
/// Deduplicated by product id; the triggering product leads when it has an
/// amount source, and is dropped otherwise.
fn collect_product_contexts(
    contract: &Contract,
    req: &BridgeRequest<'_>,
    matching_id: &str,
) -> Vec<ProductContext> {
    let matching_tier = tier_of(contract, matching_id);
    let mut contexts: Vec<ProductContext> = Vec::new();

    let push_unique = |contexts: &mut Vec<ProductContext>, ctx: ProductContext| {
        if !contexts.iter().any(|c| c.product_id == ctx.product_id) {
            contexts.push(ctx);
        }
    };

    for add in req.add_credits {
        let Some(schedule) = &add.access_schedule else {
            continue;
        };
        let Some(item) = schedule.schedule_items.first() else {
            continue;
        };
        push_unique(
            &mut contexts,
            ProductContext {
                product_id: add.product_id.clone(),
                amount: item.amount,
                credit_type_id: schedule.credit_type_id.clone(),
            },
        );
    }

    for credit in &contract.credits {
        if credit.is_archived() {
            continue;
        }
        let bound = credit.subscription_id.as_deref() == Some(matching_id)
            || (matching_tier.is_some() && credit.tier_id() == matching_tier.as_deref());
        if !bound {
            continue;
        }
        let Some(item) = credit.schedule_item() else {
            continue;
        };
        push_unique(
            &mut contexts,
            ProductContext {
                product_id: credit.product_id.clone(),
                amount: item.amount,
                credit_type_id: credit.access_schedule.credit_type_id.clone(),
            },
        );
    }

    match contexts
        .iter()
        .position(|c| c.product_id == req.product_id)
    {
        Some(position) => {
            let ctx = contexts.remove(position);
            contexts.insert(0, ctx);
        }
        None => {
            tracing::debug!(
                product_id = req.product_id,
                "No amount source for triggering product; skipping its bridge context"
            );
        }
    }

    contexts
}

/// Attempt to bridge one newly added recurring credit. A no-op unless the
/// credit is future-dated, subscription-bound, and the edit is a genuine
/// swap or uncancel.
pub fn bridge_recurring_credit(contract: &mut Contract, req: &BridgeRequest<'_>) {
    let Some(target_id) = req.target_subscription_id else {
        return;
    };
    if req.normalized_start <= req.now {
        return;
    }

    let Some((matching_id, strategy)) = find_matching_subscription(contract, req, target_id)
    else {
        tracing::debug!(
            product_id = req.product_id,
            "No bridge candidate subscription"
        );
        return;
    };

    // Genuine swap/uncancel only: either the target is being ended in this
    // same edit, or the gap is served by a different subscription.
    let target_ending = req
        .ending_subscription_ids
        .iter()
        .any(|id| id == target_id);
    if !target_ending && matching_id == target_id {
        return;
    }

    let current_period_start = floor_to_hour(contract.starting_at.max(floor_to_month(req.now)));
    let current_period_end = floor_to_hour(floor_to_month(req.normalized_start));
    if current_period_end <= current_period_start {
        return;
    }

    tracing::debug!(
        product_id = req.product_id,
        strategy = strategy.as_str(),
        subscription_id = %matching_id,
        target_subscription_id = %target_id,
        "Bridging recurring credit"
    );

    let contexts = collect_product_contexts(contract, req, &matching_id);
    let matching_tier = tier_of(contract, &matching_id);
    let target_tier = tier_of(contract, target_id);

    for ctx in contexts {
        let current_period = CreditUpsert {
            product_id: ctx.product_id.clone(),
            starting_at: current_period_start,
            ending_before: current_period_end,
            amount: ctx.amount,
            credit_type_id: ctx.credit_type_id.clone(),
            subscription_id: Some(matching_id.clone()),
            tier_id: matching_tier.clone(),
        };

        // Nothing to bridge when an active recurring credit already covers
        // the product and the current-period credit is on file.
        let covered = contract.recurring_credits.iter().any(|rc| {
            matches_active(
                rc,
                &ctx.product_id,
                req.normalized_start,
                Some(target_id),
                req.normalized_start,
            )
        }) && has_credit_in_slot(contract, &current_period);
        if covered {
            continue;
        }

        ensure_recurring_credit(contract, &ctx.product_id, req.normalized_start, target_id);

        // Current period on the outgoing side, next period on the incoming.
        upsert_credit(contract, current_period);

        let next_start = floor_to_month(current_period_end);
        let next_end = floor_to_hour(add_months(next_start, 1));
        upsert_credit(
            contract,
            CreditUpsert {
                product_id: ctx.product_id.clone(),
                starting_at: next_start,
                ending_before: next_end,
                amount: ctx.amount,
                credit_type_id: ctx.credit_type_id.clone(),
                subscription_id: Some(target_id.to_string()),
                tier_id: target_tier.clone(),
            },
        );

        record_bridge_credit(&ctx.product_id);
    }
}
