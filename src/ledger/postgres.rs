use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction as PgTransaction};

use super::{LedgerSession, MatchingKey, SessionSource, StoreError};
use crate::database::Database;
use crate::models::{Component, NewTransaction, Transaction, TransactionStatus};

/// A ledger session backed by one PostgreSQL transaction.
pub struct PgLedgerSession {
    tx: PgTransaction<'static, Postgres>,
}

impl PgLedgerSession {
    pub async fn begin(db: &Database) -> Result<Self, StoreError> {
        Ok(Self { tx: db.begin().await? })
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerSession for PgLedgerSession {
    async fn lock_component(&mut self, id: i32) -> Result<Option<Component>, StoreError> {
        let component = sqlx::query_as::<_, Component>(
            "SELECT * FROM components WHERE id = $1 FOR UPDATE"
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(component)
    }

    async fn find_open_by_key(&mut self, key: &MatchingKey) -> Result<Option<Transaction>, StoreError> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE component_id = $1
              AND lab_id IS NOT DISTINCT FROM $2
              AND campus IS NOT DISTINCT FROM $3
              AND person_name = $4
              AND purpose = $5
              AND status = ANY($6)
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(key.component_id)
        .bind(key.lab_id)
        .bind(&key.campus)
        .bind(&key.person_name)
        .bind(&key.purpose)
        .bind(TransactionStatus::open_labels())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(txn)
    }

    async fn find_transaction(&mut self, id: i32) -> Result<Option<Transaction>, StoreError> {
        let txn = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(txn)
    }

    async fn insert_transaction(&mut self, new: &NewTransaction) -> Result<Transaction, StoreError> {
        let txn = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                component_id, lab_id, campus, person_name, purpose,
                qty_issued, qty_returned, pending_qty, status,
                issue_date, date, quantity_before, quantity_after,
                transaction_quantity, last_action, notes, last_updated
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $12, $13, $14, $15, $10)
            RETURNING *
            "#,
        )
        .bind(new.component_id)
        .bind(new.lab_id)
        .bind(&new.campus)
        .bind(&new.person_name)
        .bind(&new.purpose)
        .bind(new.qty_issued)
        .bind(new.qty_returned)
        .bind(new.pending_qty)
        .bind(new.status.as_str())
        .bind(new.issue_date)
        .bind(new.quantity_before)
        .bind(new.quantity_after)
        .bind(new.transaction_quantity)
        .bind(new.last_action.as_str())
        .bind(&new.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(txn)
    }

    async fn update_transaction(&mut self, txn: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE transactions SET
                qty_issued = $1, qty_returned = $2, pending_qty = $3, status = $4,
                date = $5, quantity_before = $6, quantity_after = $7,
                transaction_quantity = $8, last_action = $9, notes = $10, last_updated = $11
            WHERE id = $12
            "#,
        )
        .bind(txn.qty_issued)
        .bind(txn.qty_returned)
        .bind(txn.pending_qty)
        .bind(txn.status.as_str())
        .bind(txn.date)
        .bind(txn.quantity_before)
        .bind(txn.quantity_after)
        .bind(txn.transaction_quantity)
        .bind(txn.last_action.as_str())
        .bind(&txn.notes)
        .bind(txn.last_updated)
        .bind(txn.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_component_quantity(
        &mut self,
        id: i32,
        quantity: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE components SET quantity = $1, last_updated = $2 WHERE id = $3")
            .bind(quantity)
            .bind(at)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

/// Opens one PostgreSQL transaction per ledger attempt.
#[derive(Clone)]
pub struct PgSessionSource {
    db: Database,
}

impl PgSessionSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionSource for PgSessionSource {
    type Session = PgLedgerSession;

    async fn begin(&self) -> Result<PgLedgerSession, StoreError> {
        PgLedgerSession::begin(&self.db).await
    }

    async fn commit(&self, session: PgLedgerSession) -> Result<(), StoreError> {
        session.commit().await
    }

    async fn rollback(&self, session: PgLedgerSession) -> Result<(), StoreError> {
        session.rollback().await
    }
}

#[cfg(test)]
mod tests {
    //! Runs against a real database. Opt in with
    //! `LABSTOCK_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
    //! The database must be disposable: the test creates and deletes its own rows.

    use super::*;
    use crate::database::test_database;
    use crate::ledger::{Ledger, LedgerCommand, LedgerError, MovementRequest, TransactionKind};

    async fn seed_component(db: &Database, quantity: i32) -> (i32, i32) {
        let lab_id: i32 = sqlx::query_scalar("INSERT INTO labs (name) VALUES ('ledger-test lab') RETURNING id")
            .fetch_one(db)
            .await
            .unwrap();
        let category_id: i32 = sqlx::query_scalar(
            "INSERT INTO categories (name, lab_id) VALUES ('ledger-test category', $1) RETURNING id",
        )
        .bind(lab_id)
        .fetch_one(db)
        .await
        .unwrap();
        let component_id: i32 = sqlx::query_scalar(
            "INSERT INTO components (name, category_id, lab_id, quantity) VALUES ('ledger-test part', $1, $2, $3) RETURNING id",
        )
        .bind(category_id)
        .bind(lab_id)
        .bind(quantity)
        .fetch_one(db)
        .await
        .unwrap();
        (lab_id, component_id)
    }

    async fn cleanup(db: &Database, lab_id: i32, component_id: i32) {
        sqlx::query("DELETE FROM transactions WHERE component_id = $1")
            .bind(component_id)
            .execute(db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM components WHERE id = $1")
            .bind(component_id)
            .execute(db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM categories WHERE lab_id = $1")
            .bind(lab_id)
            .execute(db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM labs WHERE id = $1")
            .bind(lab_id)
            .execute(db)
            .await
            .unwrap();
    }

    fn issue(lab_id: i32, component_id: i32, quantity: i32) -> LedgerCommand {
        LedgerCommand::Record {
            kind: TransactionKind::Issue,
            request: MovementRequest {
                component_id: Some(component_id),
                lab_id: Some(lab_id),
                campus: None,
                person_name: "Kiran".into(),
                purpose: "Line follower".into(),
                quantity,
                notes: None,
            },
        }
    }

    #[tokio::test]
    #[ignore = "requires a disposable PostgreSQL database; opt in via LABSTOCK_TEST_DATABASE_URL"]
    async fn concurrent_issues_never_oversell_or_split_the_open_transaction() {
        let Some(db) = test_database().await else { return };
        let (lab_id, component_id) = seed_component(&db, 10).await;
        let ledger = Ledger::new(db.clone());

        // Four requests for 3 units each against 10 in stock: exactly three can succeed.
        let command = issue(lab_id, component_id, 3);
        let (a, b, c, d) = tokio::join!(
            ledger.execute(&command),
            ledger.execute(&command),
            ledger.execute(&command),
            ledger.execute(&command),
        );
        let results = [a, b, c, d];

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 3);
        for failed in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(matches!(failed, LedgerError::InsufficientStock { .. }), "{failed}");
        }

        let stock: i32 = sqlx::query_scalar("SELECT quantity FROM components WHERE id = $1")
            .bind(component_id)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(stock, 1);

        let rows = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE component_id = $1")
            .bind(component_id)
            .fetch_all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "merged into one open transaction");
        let txn = &rows[0];
        assert_eq!(txn.status, TransactionStatus::Issued);
        assert_eq!(txn.qty_issued, 9);
        assert_eq!(txn.pending_qty, txn.qty_issued - txn.qty_returned);

        cleanup(&db, lab_id, component_id).await;
    }

    #[tokio::test]
    #[ignore = "requires a disposable PostgreSQL database; opt in via LABSTOCK_TEST_DATABASE_URL"]
    async fn failed_issue_leaves_stock_untouched() {
        let Some(db) = test_database().await else { return };
        let (lab_id, component_id) = seed_component(&db, 2).await;
        let ledger = Ledger::new(db.clone());

        let err = ledger.execute(&issue(lab_id, component_id, 5)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { requested: 5, available: 2 }));

        let stock: i32 = sqlx::query_scalar("SELECT quantity FROM components WHERE id = $1")
            .bind(component_id)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(stock, 2);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE component_id = $1")
            .bind(component_id)
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);

        cleanup(&db, lab_id, component_id).await;
    }
}
