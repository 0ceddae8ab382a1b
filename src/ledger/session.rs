use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{MatchingKey, StoreError};
use crate::models::{Component, NewTransaction, Transaction};

/// Store access scoped to a single ledger operation.
///
/// Implementations run every call inside one storage transaction and hold the
/// component row returned by `lock_component` until that transaction ends, so
/// concurrent operations on the same component queue up behind each other.
#[async_trait]
pub trait LedgerSession: Send {
    async fn lock_component(&mut self, id: i32) -> Result<Option<Component>, StoreError>;

    /// The transaction for `key` whose status is `Issued` or `Partially Returned`, if any.
    async fn find_open_by_key(&mut self, key: &MatchingKey) -> Result<Option<Transaction>, StoreError>;

    async fn find_transaction(&mut self, id: i32) -> Result<Option<Transaction>, StoreError>;

    async fn insert_transaction(&mut self, new: &NewTransaction) -> Result<Transaction, StoreError>;

    async fn update_transaction(&mut self, txn: &Transaction) -> Result<(), StoreError>;

    async fn set_component_quantity(
        &mut self,
        id: i32,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
