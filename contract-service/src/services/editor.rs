//! Contract edit processing.
//!
//! One edit request is a single unit of work over one contract. All
//! mutations are staged against a clone of the aggregate and committed only
//! on success, so a failing edit never leaves the contract partially
//! mutated. Edits to the same contract are serialized by a per-contract
//! lock.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use service_core::error::AppError;

use crate::dtos::EditContractRequest;
use crate::models::{
    Contract, PaymentGateStatus, PrepaidBalanceThresholdConfiguration, ProductOverride,
    QuantityScheduleItem, RecurringCredit, Subscription, SubscriptionRate, ThresholdCommit,
    TIER_ID_FIELD,
};
use crate::services::balances::BalanceService;
use crate::services::bridging::{bridge_recurring_credit, upsert_credit, BridgeRequest, CreditUpsert};
use crate::services::events::{ContractEventKind, EventEmitter};
use crate::services::matcher::matches_active;
use crate::services::metrics::{record_edit, EDIT_DURATION};
use crate::services::periods::billing_periods;
use crate::services::store::ContractStore;
use crate::services::time::{add_months, floor_to_hour, floor_to_month};

/// Payment-gate work recorded while applying the threshold configuration and
/// executed only after the contract is committed.
#[derive(Debug, Clone)]
pub struct PendingPaymentGate {
    pub product_id: String,
    pub status: PaymentGateStatus,
    pub threshold_amount: Decimal,
    pub recharge_to_amount: Decimal,
}

pub struct EditOutcome {
    pub id: String,
}

/// Orchestrates one contract edit end to end: validate, stage, commit, emit.
pub struct ContractEditor {
    store: ContractStore,
    emitter: Arc<dyn EventEmitter>,
    balances: BalanceService,
}

impl ContractEditor {
    pub fn new(
        store: ContractStore,
        emitter: Arc<dyn EventEmitter>,
        balances: BalanceService,
    ) -> Self {
        Self {
            store,
            emitter,
            balances,
        }
    }

    #[instrument(
        skip(self, request),
        fields(contract_id = %request.contract_id, customer_id = %request.customer_id)
    )]
    pub async fn process(&self, request: EditContractRequest) -> Result<EditOutcome, AppError> {
        let timer = EDIT_DURATION.start_timer();
        let result = self.process_inner(request).await;
        timer.observe_duration();
        match &result {
            Ok(_) => record_edit("ok"),
            Err(_) => record_edit("error"),
        }
        result
    }

    async fn process_inner(&self, request: EditContractRequest) -> Result<EditOutcome, AppError> {
        request.validate()?;

        let lock = self.store.edit_lock(&request.contract_id);
        let _guard = lock.lock().await;

        let now = Utc::now();

        // Preconditions, before any mutation.
        let contract = self.store.contract(&request.contract_id).ok_or_else(|| {
            AppError::NotFound(anyhow!("Contract {} not found", request.contract_id))
        })?;
        let customer = self.store.customer(&request.customer_id).ok_or_else(|| {
            AppError::NotFound(anyhow!("Customer {} not found", request.customer_id))
        })?;
        if contract.customer_id != customer.id {
            return Err(AppError::NotFound(anyhow!(
                "Contract {} does not belong to customer {}",
                contract.id,
                customer.id
            )));
        }
        if let Some(key) = &request.uniqueness_key {
            if self.store.has_uniqueness_key(key) {
                return Err(AppError::Conflict(anyhow!(
                    "Uniqueness key {} already registered",
                    key
                )));
            }
        }

        // Stage every mutation on a clone; nothing is visible until commit.
        let mut staged = contract;
        let pending_gate = apply_edit(&mut staged, &request, now)?;

        if let Some(key) = &request.uniqueness_key {
            self.store.add_uniqueness_key(key);
        }
        self.store.update_contract(staged.clone());

        tracing::info!(
            subscriptions = staged.subscriptions.len(),
            credits = staged.credits.len(),
            recurring_credits = staged.recurring_credits.len(),
            "Contract edit committed"
        );

        if let Some(gate) = pending_gate {
            // Failed payments floor the recharge at the lesser of the two
            // configured amounts.
            let amount = match gate.status {
                PaymentGateStatus::Paid => gate.recharge_to_amount,
                PaymentGateStatus::Failed => gate.threshold_amount.min(gate.recharge_to_amount),
            };
            self.balances
                .set_balance(&staged.customer_id, &gate.product_id, amount)
                .await?;
            self.emitter
                .payment_gate_status(&staged.customer_id, &staged.id, gate.status)
                .await;
        }

        self.emitter
            .contract_event(&staged, ContractEventKind::Updated)
            .await;

        Ok(EditOutcome {
            id: Uuid::new_v4().to_string(),
        })
    }
}

/// Apply one edit to a staged contract. Steps run in fixed order; each is a
/// no-op when its input list is empty.
pub fn apply_edit(
    contract: &mut Contract,
    request: &EditContractRequest,
    now: DateTime<Utc>,
) -> Result<Option<PendingPaymentGate>, AppError> {
    // Subscription updates.
    for update in &request.update_subscriptions {
        let sub = contract
            .subscription_mut(&update.subscription_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow!("Subscription {} not found", update.subscription_id))
            })?;
        if let Some(ending_before) = update.ending_before {
            sub.ending_before = Some(ending_before);
        }
        // A still-open current period keeps an hour-aligned month boundary.
        if sub.billing_periods.current.ending_before > now {
            let refloored = floor_to_hour(floor_to_month(sub.billing_periods.current.ending_before));
            sub.billing_periods.current.ending_before = refloored;
            sub.billing_periods.next.starting_at = refloored;
        }
    }

    // Recurring-credit updates.
    for update in &request.update_recurring_credits {
        let rc = contract
            .recurring_credit_mut(&update.recurring_credit_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow!(
                    "Recurring credit {} not found",
                    update.recurring_credit_id
                ))
            })?;
        if let Some(ending_before) = update.ending_before {
            rc.ending_before = Some(ending_before);
        }
    }

    // Credit archival.
    for archive in &request.archive_credits {
        let credit = contract
            .credit_mut(&archive.id)
            .ok_or_else(|| AppError::NotFound(anyhow!("Credit {} not found", archive.id)))?;
        credit.archived_at = Some(now);
    }

    // New subscriptions.
    for add in &request.add_subscriptions {
        let id = add
            .temporary_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let frequency = add.subscription_rate.billing_frequency;
        contract.subscriptions.push(Subscription {
            id,
            starting_at: add.starting_at,
            ending_before: None,
            subscription_rate: SubscriptionRate {
                product_id: add.subscription_rate.product_id.clone(),
                billing_frequency: frequency,
            },
            quantity_schedule: vec![QuantityScheduleItem {
                starting_at: add.starting_at,
                quantity: add.initial_quantity.unwrap_or(1),
            }],
            custom_fields: add.custom_fields.clone().unwrap_or_default(),
            billing_periods: billing_periods(add.starting_at, frequency),
        });
    }

    // New recurring credits, each followed by a bridging attempt.
    let ending_subscription_ids: Vec<String> = request
        .update_subscriptions
        .iter()
        .map(|u| u.subscription_id.clone())
        .collect();
    for add in &request.add_recurring_credits {
        let normalized_start = floor_to_hour(add.starting_at);
        let subscription_id = add
            .subscription_config
            .as_ref()
            .map(|c| c.subscription_id.clone());

        let duplicate = contract.recurring_credits.iter().any(|rc| {
            matches_active(
                rc,
                &add.product_id,
                normalized_start,
                subscription_id.as_deref(),
                normalized_start,
            )
        });
        if !duplicate {
            contract.recurring_credits.push(RecurringCredit {
                id: Uuid::new_v4().to_string(),
                product_id: add.product_id.clone(),
                starting_at: normalized_start,
                ending_before: None,
                subscription_id: subscription_id.clone(),
            });
        }

        bridge_recurring_credit(
            contract,
            &BridgeRequest {
                product_id: &add.product_id,
                normalized_start,
                target_subscription_id: subscription_id.as_deref(),
                ending_subscription_ids: &ending_subscription_ids,
                add_credits: &request.add_credits,
                now,
            },
        );
    }

    // One-time credits, with the adjoining next-period auto-credit.
    for add in &request.add_credits {
        let Some(schedule) = &add.access_schedule else {
            continue;
        };
        let subscription_id = add
            .subscription_config
            .as_ref()
            .map(|c| c.subscription_id.clone());
        let tier_id = add
            .custom_fields
            .as_ref()
            .and_then(|fields| fields.get(TIER_ID_FIELD))
            .cloned();

        for item in &schedule.schedule_items {
            upsert_credit(
                contract,
                CreditUpsert {
                    product_id: add.product_id.clone(),
                    starting_at: item.starting_at,
                    ending_before: item.ending_before,
                    amount: item.amount,
                    credit_type_id: schedule.credit_type_id.clone(),
                    subscription_id: subscription_id.clone(),
                    tier_id: tier_id.clone(),
                },
            );

            // A recurring credit starting exactly where this credit ends
            // continues it into the next period.
            let follow = contract
                .recurring_credits
                .iter()
                .find(|rc| {
                    rc.product_id == add.product_id
                        && rc.starting_at == item.ending_before
                        && rc.subscription_id == subscription_id
                        && rc.ending_before.map_or(true, |e| e > rc.starting_at)
                })
                .cloned();
            if let Some(rc) = follow {
                let bound_tier = rc
                    .subscription_id
                    .as_deref()
                    .and_then(|id| contract.subscription(id))
                    .and_then(|s| s.tier_id().map(str::to_string));
                let next_end = floor_to_hour(add_months(floor_to_month(item.ending_before), 1));
                upsert_credit(
                    contract,
                    CreditUpsert {
                        product_id: add.product_id.clone(),
                        starting_at: item.ending_before,
                        ending_before: next_end,
                        amount: item.amount,
                        credit_type_id: schedule.credit_type_id.clone(),
                        subscription_id: rc.subscription_id.clone(),
                        tier_id: bound_tier,
                    },
                );
            }
        }
    }

    // Overrides.
    for add in &request.add_overrides {
        contract.overrides.push(ProductOverride {
            id: Uuid::new_v4().to_string(),
            product_id: add.product_id.clone(),
            starting_at: add.starting_at,
            entitled: add.entitled,
        });
    }

    // Threshold configuration: patch on update, replace wholesale on add.
    let mut pending_gate = None;
    if let Some(update) = &request.update_prepaid_balance_threshold_configuration {
        let config = contract
            .prepaid_balance_threshold_configuration
            .as_mut()
            .ok_or_else(|| {
                AppError::BadRequest(anyhow!("Contract has no threshold configuration to update"))
            })?;
        if let Some(is_enabled) = update.is_enabled {
            config.is_enabled = is_enabled;
        }
        if let Some(threshold_amount) = update.threshold_amount {
            config.threshold_amount = threshold_amount;
        }
        if let Some(recharge_to_amount) = update.recharge_to_amount {
            config.recharge_to_amount = recharge_to_amount;
        }
        if let Some(payment_gate_config) = &update.payment_gate_config {
            config.payment_gate_config = Some(payment_gate_config.clone());
        }
        if let Some(commit) = &update.commit {
            config.commit = Some(ThresholdCommit {
                product_id: commit.product_id.clone(),
                applicable_product_tags: commit.applicable_product_tags.clone(),
            });
        }
    }
    if let Some(add) = &request.add_prepaid_balance_threshold_configuration {
        let config = PrepaidBalanceThresholdConfiguration {
            is_enabled: add.is_enabled,
            threshold_amount: add.threshold_amount,
            recharge_to_amount: add.recharge_to_amount,
            payment_gate_config: add.payment_gate_config.clone(),
            commit: add.commit.as_ref().map(|commit| ThresholdCommit {
                product_id: commit.product_id.clone(),
                applicable_product_tags: commit.applicable_product_tags.clone(),
            }),
        };
        if let (Some(commit), Some(status)) = (&config.commit, add.mock_payment_status) {
            pending_gate = Some(PendingPaymentGate {
                product_id: commit.product_id.clone(),
                status,
                threshold_amount: config.threshold_amount,
                recharge_to_amount: config.recharge_to_amount,
            });
        }
        contract.prepaid_balance_threshold_configuration = Some(config);
    }

    Ok(pending_gate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::{
        AccessScheduleInput, AddCredit, AddRecurringCredit, AddSubscription,
        AddThresholdConfiguration, ArchiveCredit, ScheduleItemInput, SubscriptionConfig,
        SubscriptionRateInput, ThresholdCommitInput, UpdateRecurringCredit, UpdateSubscription,
    };
    use crate::models::{
        AccessSchedule, BillingFrequency, BillingPeriod, BillingPeriods, Credit, ScheduleItem,
    };
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn contract(start: &str) -> Contract {
        Contract::new(
            "c_1".to_string(),
            "cust_1".to_string(),
            utc(start),
            None,
            utc(start),
        )
    }

    fn subscription(id: &str, product: &str, start: &str, tier: Option<&str>) -> Subscription {
        let mut custom_fields = BTreeMap::new();
        if let Some(tier) = tier {
            custom_fields.insert(TIER_ID_FIELD.to_string(), tier.to_string());
        }
        Subscription {
            id: id.to_string(),
            starting_at: utc(start),
            ending_before: None,
            subscription_rate: SubscriptionRate {
                product_id: product.to_string(),
                billing_frequency: BillingFrequency::Monthly,
            },
            quantity_schedule: vec![QuantityScheduleItem {
                starting_at: utc(start),
                quantity: 1,
            }],
            custom_fields,
            billing_periods: billing_periods(utc(start), BillingFrequency::Monthly),
        }
    }

    fn existing_credit(
        id: &str,
        product: &str,
        start: &str,
        end: &str,
        amount: Decimal,
        subscription_id: Option<&str>,
    ) -> Credit {
        Credit {
            id: id.to_string(),
            product_id: product.to_string(),
            access_schedule: AccessSchedule {
                credit_type_id: Some("ct_1".to_string()),
                schedule_items: vec![ScheduleItem {
                    starting_at: utc(start),
                    ending_before: utc(end),
                    amount,
                }],
            },
            archived_at: None,
            subscription_id: subscription_id.map(str::to_string),
            custom_fields: BTreeMap::new(),
        }
    }

    fn base_request() -> EditContractRequest {
        EditContractRequest {
            contract_id: "c_1".to_string(),
            customer_id: "cust_1".to_string(),
            ..Default::default()
        }
    }

    fn add_subscription(
        temporary_id: &str,
        product: &str,
        start: &str,
        tier: Option<&str>,
    ) -> AddSubscription {
        AddSubscription {
            temporary_id: Some(temporary_id.to_string()),
            starting_at: utc(start),
            subscription_rate: SubscriptionRateInput {
                product_id: product.to_string(),
                billing_frequency: BillingFrequency::Monthly,
            },
            initial_quantity: None,
            custom_fields: tier.map(|tier| {
                let mut fields = BTreeMap::new();
                fields.insert(TIER_ID_FIELD.to_string(), tier.to_string());
                fields
            }),
        }
    }

    fn add_credit(
        product: &str,
        start: &str,
        end: &str,
        amount: Decimal,
        subscription_id: Option<&str>,
    ) -> AddCredit {
        AddCredit {
            product_id: product.to_string(),
            access_schedule: Some(AccessScheduleInput {
                credit_type_id: Some("ct_1".to_string()),
                schedule_items: vec![ScheduleItemInput {
                    starting_at: utc(start),
                    ending_before: utc(end),
                    amount,
                }],
            }),
            subscription_config: subscription_id.map(|id| SubscriptionConfig {
                subscription_id: id.to_string(),
            }),
            custom_fields: None,
        }
    }

    #[test]
    fn added_subscription_gets_calendar_aligned_periods() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        let mut request = base_request();
        request.add_subscriptions = vec![add_subscription(
            "sub_1",
            "p1",
            "2024-01-01T00:00:00Z",
            None,
        )];

        apply_edit(&mut contract, &request, utc("2024-01-15T08:00:00Z")).unwrap();

        let sub = contract.subscription("sub_1").unwrap();
        assert_eq!(
            sub.billing_periods.current,
            BillingPeriod {
                starting_at: utc("2024-01-01T00:00:00Z"),
                ending_before: utc("2024-02-01T00:00:00Z"),
            }
        );
        assert_eq!(
            sub.billing_periods.next.starting_at,
            utc("2024-02-01T00:00:00Z")
        );
        assert_eq!(sub.quantity_schedule[0].quantity, 1);
    }

    #[test]
    fn duplicate_recurring_credit_is_suppressed() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        let recurring = AddRecurringCredit {
            product_id: "p1".to_string(),
            starting_at: utc("2024-03-01T00:30:00Z"),
            subscription_config: None,
        };
        let mut request = base_request();
        request.add_recurring_credits = vec![
            recurring,
            AddRecurringCredit {
                product_id: "p1".to_string(),
                starting_at: utc("2024-03-01T00:00:00Z"),
                subscription_config: None,
            },
        ];

        let now = utc("2024-02-10T12:00:00Z");
        apply_edit(&mut contract, &request, now).unwrap();
        assert_eq!(contract.recurring_credits.len(), 1);
        assert_eq!(
            contract.recurring_credits[0].starting_at,
            utc("2024-03-01T00:00:00Z")
        );

        // Resubmitting does not create a second active record either.
        apply_edit(&mut contract, &request, now).unwrap();
        assert_eq!(contract.recurring_credits.len(), 1);
    }

    #[test]
    fn adjoining_credit_generates_one_next_period_credit() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        contract.subscriptions.push(subscription(
            "sub_1",
            "p1",
            "2024-01-01T00:00:00Z",
            Some("pro"),
        ));
        contract.recurring_credits.push(RecurringCredit {
            id: "rc_1".to_string(),
            product_id: "p1".to_string(),
            starting_at: utc("2024-03-01T00:00:00Z"),
            ending_before: None,
            subscription_id: Some("sub_1".to_string()),
        });

        let mut request = base_request();
        request.add_credits = vec![add_credit(
            "p1",
            "2024-02-01T00:00:00Z",
            "2024-03-01T00:00:00Z",
            dec!(100),
            Some("sub_1"),
        )];

        let now = utc("2024-02-10T12:00:00Z");
        apply_edit(&mut contract, &request, now).unwrap();

        assert_eq!(contract.credits.len(), 2);
        let follow_on = contract
            .credits
            .iter()
            .find(|c| c.schedule_item().unwrap().starting_at == utc("2024-03-01T00:00:00Z"))
            .unwrap();
        assert_eq!(
            follow_on.schedule_item().unwrap().ending_before,
            utc("2024-04-01T00:00:00Z")
        );
        assert_eq!(follow_on.schedule_item().unwrap().amount, dec!(100));
        assert_eq!(follow_on.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(follow_on.tier_id(), Some("pro"));

        // Exactly one follow-on credit even when resubmitted.
        apply_edit(&mut contract, &request, now).unwrap();
        assert_eq!(contract.credits.len(), 2);
    }

    #[test]
    fn subscription_swap_bridges_both_sides_of_the_gap() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        contract.subscriptions.push(subscription(
            "sub_1",
            "p1",
            "2024-01-01T00:00:00Z",
            Some("pro"),
        ));

        let mut request = base_request();
        request.update_subscriptions = vec![UpdateSubscription {
            subscription_id: "sub_1".to_string(),
            ending_before: Some(utc("2024-03-01T00:00:00Z")),
        }];
        request.add_subscriptions = vec![add_subscription(
            "sub_2",
            "p1",
            "2024-03-01T00:00:00Z",
            Some("pro"),
        )];
        request.add_recurring_credits = vec![AddRecurringCredit {
            product_id: "p1".to_string(),
            starting_at: utc("2024-03-01T00:00:00Z"),
            subscription_config: Some(SubscriptionConfig {
                subscription_id: "sub_2".to_string(),
            }),
        }];
        request.add_credits = vec![add_credit(
            "p1",
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z",
            dec!(500),
            Some("sub_2"),
        )];

        let now = utc("2024-02-10T12:00:00Z");
        apply_edit(&mut contract, &request, now).unwrap();

        assert_eq!(
            contract.subscription("sub_1").unwrap().ending_before,
            Some(utc("2024-03-01T00:00:00Z"))
        );

        let unarchived: Vec<_> = contract.credits.iter().filter(|c| !c.is_archived()).collect();
        assert_eq!(unarchived.len(), 2);

        let outgoing = unarchived
            .iter()
            .find(|c| c.subscription_id.as_deref() == Some("sub_1"))
            .expect("bridge credit for the outgoing subscription");
        let outgoing_item = outgoing.schedule_item().unwrap();
        assert_eq!(outgoing_item.starting_at, utc("2024-02-01T00:00:00Z"));
        assert_eq!(outgoing_item.ending_before, utc("2024-03-01T00:00:00Z"));
        assert_eq!(outgoing_item.amount, dec!(500));
        assert_eq!(outgoing.tier_id(), Some("pro"));

        let incoming = unarchived
            .iter()
            .find(|c| c.subscription_id.as_deref() == Some("sub_2"))
            .expect("bridge credit for the incoming subscription");
        let incoming_item = incoming.schedule_item().unwrap();
        assert_eq!(incoming_item.starting_at, utc("2024-03-01T00:00:00Z"));
        assert_eq!(incoming_item.ending_before, utc("2024-04-01T00:00:00Z"));
        assert_eq!(incoming_item.amount, dec!(500));

        assert_eq!(contract.recurring_credits.len(), 1);
        assert_eq!(
            contract.recurring_credits[0].subscription_id.as_deref(),
            Some("sub_2")
        );
    }

    #[test]
    fn resubmitted_bridge_updates_credits_in_place() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        contract.subscriptions.push(subscription(
            "sub_1",
            "p1",
            "2024-01-01T00:00:00Z",
            Some("pro"),
        ));

        let now = utc("2024-02-10T12:00:00Z");

        let mut first = base_request();
        first.update_subscriptions = vec![UpdateSubscription {
            subscription_id: "sub_1".to_string(),
            ending_before: Some(utc("2024-03-01T00:00:00Z")),
        }];
        first.add_subscriptions = vec![add_subscription(
            "sub_2",
            "p1",
            "2024-03-01T00:00:00Z",
            Some("pro"),
        )];
        first.add_recurring_credits = vec![AddRecurringCredit {
            product_id: "p1".to_string(),
            starting_at: utc("2024-03-01T00:00:00Z"),
            subscription_config: Some(SubscriptionConfig {
                subscription_id: "sub_2".to_string(),
            }),
        }];
        first.add_credits = vec![add_credit(
            "p1",
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z",
            dec!(500),
            Some("sub_2"),
        )];
        apply_edit(&mut contract, &first, now).unwrap();

        // Identical edit minus the subscription add; the gap is the same.
        let mut second = base_request();
        second.update_subscriptions = vec![UpdateSubscription {
            subscription_id: "sub_1".to_string(),
            ending_before: Some(utc("2024-03-01T00:00:00Z")),
        }];
        second.add_recurring_credits = vec![AddRecurringCredit {
            product_id: "p1".to_string(),
            starting_at: utc("2024-03-01T00:00:00Z"),
            subscription_config: Some(SubscriptionConfig {
                subscription_id: "sub_2".to_string(),
            }),
        }];
        second.add_credits = vec![add_credit(
            "p1",
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z",
            dec!(500),
            Some("sub_2"),
        )];
        apply_edit(&mut contract, &second, now).unwrap();

        assert_eq!(
            contract.credits.iter().filter(|c| !c.is_archived()).count(),
            2
        );
        assert_eq!(contract.recurring_credits.len(), 1);
    }

    #[test]
    fn archive_and_recurring_updates_apply() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        contract.credits.push(existing_credit(
            "cr_1",
            "p1",
            "2024-01-01T00:00:00Z",
            "2024-02-01T00:00:00Z",
            dec!(50),
            None,
        ));
        contract.recurring_credits.push(RecurringCredit {
            id: "rc_1".to_string(),
            product_id: "p1".to_string(),
            starting_at: utc("2024-01-01T00:00:00Z"),
            ending_before: None,
            subscription_id: None,
        });

        let mut request = base_request();
        request.archive_credits = vec![ArchiveCredit {
            id: "cr_1".to_string(),
        }];
        request.update_recurring_credits = vec![UpdateRecurringCredit {
            recurring_credit_id: "rc_1".to_string(),
            ending_before: Some(utc("2024-06-01T00:00:00Z")),
        }];

        let now = utc("2024-02-10T12:00:00Z");
        apply_edit(&mut contract, &request, now).unwrap();

        assert_eq!(contract.credits[0].archived_at, Some(now));
        assert_eq!(
            contract.recurring_credits[0].ending_before,
            Some(utc("2024-06-01T00:00:00Z"))
        );
    }

    #[test]
    fn future_period_end_is_refloored_on_cancellation() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        let mut sub = subscription("sub_1", "p1", "2024-02-01T00:00:00Z", None);
        // Simulate a drifted, unaligned period snapshot.
        sub.billing_periods = BillingPeriods {
            current: BillingPeriod {
                starting_at: utc("2024-02-01T00:00:00Z"),
                ending_before: utc("2024-03-15T10:30:00Z"),
            },
            next: BillingPeriod {
                starting_at: utc("2024-03-15T10:30:00Z"),
                ending_before: utc("2024-04-15T10:30:00Z"),
            },
        };
        contract.subscriptions.push(sub);

        let mut request = base_request();
        request.update_subscriptions = vec![UpdateSubscription {
            subscription_id: "sub_1".to_string(),
            ending_before: Some(utc("2024-03-20T00:00:00Z")),
        }];

        apply_edit(&mut contract, &request, utc("2024-02-10T12:00:00Z")).unwrap();

        let sub = contract.subscription("sub_1").unwrap();
        assert_eq!(
            sub.billing_periods.current.ending_before,
            utc("2024-03-01T00:00:00Z")
        );
        assert_eq!(
            sub.billing_periods.next.starting_at,
            sub.billing_periods.current.ending_before
        );
    }

    #[test]
    fn threshold_add_records_pending_payment_gate() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        let mut request = base_request();
        request.add_prepaid_balance_threshold_configuration = Some(AddThresholdConfiguration {
            is_enabled: true,
            threshold_amount: dec!(25),
            recharge_to_amount: dec!(100),
            payment_gate_config: None,
            commit: Some(ThresholdCommitInput {
                product_id: "p1".to_string(),
                applicable_product_tags: vec![],
            }),
            mock_payment_status: Some(PaymentGateStatus::Paid),
        });

        let pending = apply_edit(&mut contract, &request, utc("2024-02-10T12:00:00Z")).unwrap();

        let gate = pending.expect("payment gate pending");
        assert_eq!(gate.product_id, "p1");
        assert_eq!(gate.status, PaymentGateStatus::Paid);
        assert_eq!(gate.recharge_to_amount, dec!(100));

        let config = contract
            .prepaid_balance_threshold_configuration
            .as_ref()
            .unwrap();
        assert!(config.is_enabled);
        assert_eq!(config.threshold_amount, dec!(25));
    }

    #[test]
    fn missing_subscription_reference_fails_before_any_other_step() {
        let mut contract = contract("2024-01-01T00:00:00Z");
        let mut request = base_request();
        request.update_subscriptions = vec![UpdateSubscription {
            subscription_id: "missing".to_string(),
            ending_before: None,
        }];
        request.add_overrides = vec![crate::dtos::AddOverride {
            product_id: "p1".to_string(),
            starting_at: utc("2024-02-01T00:00:00Z"),
            entitled: true,
        }];

        let result = apply_edit(&mut contract, &request, utc("2024-02-10T12:00:00Z"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
