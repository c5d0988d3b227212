//! Business services for contract-service.

pub mod balances;
pub mod bridging;
pub mod editor;
pub mod events;
pub mod matcher;
pub mod metrics;
pub mod periods;
pub mod store;
pub mod time;

pub use balances::BalanceService;
pub use editor::{ContractEditor, EditOutcome};
pub use events::{ContractEventKind, EventEmitter, WebhookEmitter};
pub use metrics::{get_metrics, init_metrics};
pub use store::ContractStore;
