use async_trait::async_trait;
use chrono::Utc;

use super::{
    operations, LedgerError, LedgerOutcome, LedgerSession, MovementRequest, PgSessionSource, StoreError,
    TransactionKind,
};
use crate::database::Database;

const MAX_ATTEMPTS: u32 = 3;

/// Hands out sessions and ends them. Each ledger attempt gets a fresh session
/// and ends it with exactly one of `commit` or `rollback`.
#[async_trait]
pub trait SessionSource: Send + Sync {
    type Session: LedgerSession + 'static;

    async fn begin(&self) -> Result<Self::Session, StoreError>;

    async fn commit(&self, session: Self::Session) -> Result<(), StoreError>;

    async fn rollback(&self, session: Self::Session) -> Result<(), StoreError>;
}

/// A ledger operation as requested by a handler.
#[derive(Debug, Clone)]
pub enum LedgerCommand {
    Record {
        kind: TransactionKind,
        request: MovementRequest,
    },
    ReturnAgainst {
        transaction_id: i32,
        quantity: i32,
        notes: Option<String>,
    },
}

/// Runs ledger commands, one storage transaction per attempt.
#[derive(Clone)]
pub struct Ledger<S = PgSessionSource> {
    source: S,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self::with_source(PgSessionSource::new(db))
    }
}

impl<S: SessionSource> Ledger<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Executes `command` atomically. Conflicts with concurrent writers replay the
    /// whole command; domain errors roll back and return immediately.
    pub async fn execute(&self, command: &LedgerCommand) -> Result<LedgerOutcome, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.execute_once(command).await {
                Err(LedgerError::Store(err)) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    log::warn!("ledger conflict on attempt {attempt}, retrying: {err}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn execute_once(&self, command: &LedgerCommand) -> Result<LedgerOutcome, LedgerError> {
        let mut session = self.source.begin().await?;
        let now = Utc::now();

        let result = match command {
            LedgerCommand::Record { kind, request } => {
                operations::record(&mut session, *kind, request, now).await
            }
            LedgerCommand::ReturnAgainst {
                transaction_id,
                quantity,
                notes,
            } => {
                operations::return_against(&mut session, *transaction_id, *quantity, notes.as_deref(), now)
                    .await
            }
        };

        match result {
            Ok(outcome) => {
                self.source.commit(session).await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = self.source.rollback(session).await {
                    log::error!("ledger rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}
