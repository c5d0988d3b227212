//! In-memory repository for customers, contracts, and uniqueness keys.

use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{Contract, Customer};

/// Flat key-value store backing the emulator. Owns contract and customer
/// lifetime; the edit processor borrows one aggregate for the duration of a
/// single edit, serialized by the per-contract lock.
#[derive(Clone, Default)]
pub struct ContractStore {
    customers: Arc<DashMap<String, Customer>>,
    contracts: Arc<DashMap<String, Contract>>,
    uniqueness_keys: Arc<DashSet<String>>,
    edit_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_customer(&self, customer: Customer) {
        self.customers.insert(customer.id.clone(), customer);
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.customers.get(id).map(|c| c.clone())
    }

    pub fn update_customer(&self, customer: Customer) {
        self.customers.insert(customer.id.clone(), customer);
    }

    pub fn insert_contract(&self, contract: Contract) {
        self.contracts.insert(contract.id.clone(), contract);
    }

    pub fn contract(&self, id: &str) -> Option<Contract> {
        self.contracts.get(id).map(|c| c.clone())
    }

    /// Whole-aggregate replace.
    pub fn update_contract(&self, contract: Contract) {
        self.contracts.insert(contract.id.clone(), contract);
    }

    pub fn contracts_for_customer(&self, customer_id: &str) -> Vec<Contract> {
        self.contracts
            .iter()
            .filter(|entry| entry.customer_id == customer_id)
            .map(|entry| entry.clone())
            .collect()
    }

    pub fn has_uniqueness_key(&self, key: &str) -> bool {
        self.uniqueness_keys.contains(key)
    }

    pub fn add_uniqueness_key(&self, key: &str) {
        self.uniqueness_keys.insert(key.to_string());
    }

    /// Per-contract edit lock. The full edit sequence runs under it so
    /// concurrent edits to the same contract cannot interleave.
    pub fn edit_lock(&self, contract_id: &str) -> Arc<Mutex<()>> {
        self.edit_locks
            .entry(contract_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
