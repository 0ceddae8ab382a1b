use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::{LedgerSession, MatchingKey, StoreError};
use crate::models::{Component, NewTransaction, Transaction};

/// In-memory store for exercising ledger operations without a database.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemorySession {
    components: BTreeMap<i32, Component>,
    transactions: BTreeMap<i32, Transaction>,
    next_id: i32,
}

impl MemorySession {
    pub fn with_component(id: i32, quantity: i32) -> Self {
        let added = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut session = Self::default();
        session.components.insert(
            id,
            Component {
                id,
                name: format!("component-{id}"),
                category_id: 1,
                lab_id: 1,
                quantity,
                min_stock_level: 0,
                unit: None,
                description: None,
                component_type: None,
                date_added: added,
                last_updated: added,
            },
        );
        session
    }

    pub fn stock(&self, id: i32) -> i32 {
        self.components[&id].quantity
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    pub fn transaction(&self, id: i32) -> Transaction {
        self.transactions[&id].clone()
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    async fn lock_component(&mut self, id: i32) -> Result<Option<Component>, StoreError> {
        Ok(self.components.get(&id).cloned())
    }

    async fn find_open_by_key(&mut self, key: &MatchingKey) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .transactions
            .values()
            .find(|t| t.status.is_open() && MatchingKey::of(t) == *key)
            .cloned())
    }

    async fn find_transaction(&mut self, id: i32) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.get(&id).cloned())
    }

    async fn insert_transaction(&mut self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        self.next_id += 1;
        let txn = new.clone().into_transaction(self.next_id);
        self.transactions.insert(txn.id, txn.clone());
        Ok(txn)
    }

    async fn update_transaction(&mut self, txn: &Transaction) -> Result<(), StoreError> {
        self.transactions.insert(txn.id, txn.clone());
        Ok(())
    }

    async fn set_component_quantity(
        &mut self,
        id: i32,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(component) = self.components.get_mut(&id) {
            component.quantity = quantity;
            component.last_updated = at;
        }
        Ok(())
    }
}
