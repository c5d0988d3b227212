//! Domain models for contract-service.

mod contract;
mod credit;
mod customer;
mod subscription;
mod threshold;

pub use contract::{Contract, ProductOverride};
pub use credit::{AccessSchedule, Credit, RecurringCredit, ScheduleItem};
pub use customer::Customer;
pub use subscription::{
    BillingFrequency, BillingPeriod, BillingPeriods, QuantityScheduleItem, Subscription,
    SubscriptionRate, TIER_ID_FIELD,
};
pub use threshold::{PaymentGateStatus, PrepaidBalanceThresholdConfiguration, ThresholdCommit};
