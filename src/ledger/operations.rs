use chrono::{DateTime, Utc};

use super::rules::{self, Plan, TransactionChange};
use super::{LedgerError, LedgerSession, MatchingKey, Movement, MovementRequest, TransactionKind};
use crate::models::{Component, Transaction};

/// State after a successful operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerOutcome {
    pub component: Component,
    pub transaction: Transaction,
    /// False when the operation opened a new transaction.
    pub merged: bool,
}

pub async fn record<S>(
    session: &mut S,
    kind: TransactionKind,
    request: &MovementRequest,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    match kind {
        TransactionKind::Issue => issue(session, request, now).await,
        TransactionKind::Return => return_stock(session, request, now).await,
    }
}

pub async fn issue<S>(
    session: &mut S,
    request: &MovementRequest,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    let movement = request.validate()?;
    let component = session
        .lock_component(movement.key.component_id)
        .await?
        .ok_or(LedgerError::ComponentNotFound)?;
    let open = session.find_open_by_key(&movement.key).await?;

    let plan = rules::plan_issue(&component, open, &movement, now)?;
    apply(session, component, plan, now).await
}

pub async fn return_stock<S>(
    session: &mut S,
    request: &MovementRequest,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    let movement = request.validate()?;
    return_movement(session, &movement, now).await
}

/// Return against an existing transaction, matching on the key stored with it.
pub async fn return_against<S>(
    session: &mut S,
    transaction_id: i32,
    quantity: i32,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity);
    }
    let txn = session
        .find_transaction(transaction_id)
        .await?
        .ok_or(LedgerError::TransactionNotFound)?;

    let movement = Movement {
        key: MatchingKey::of(&txn),
        quantity,
        notes: super::non_blank(notes),
    };
    return_movement(session, &movement, now).await
}

async fn return_movement<S>(
    session: &mut S,
    movement: &Movement,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    let component = session
        .lock_component(movement.key.component_id)
        .await?
        .ok_or(LedgerError::ComponentNotFound)?;
    let open = session.find_open_by_key(&movement.key).await?;

    let plan = rules::plan_return(&component, open, movement, now)?;
    apply(session, component, plan, now).await
}

async fn apply<S>(
    session: &mut S,
    mut component: Component,
    plan: Plan,
    now: DateTime<Utc>,
) -> Result<LedgerOutcome, LedgerError>
where
    S: LedgerSession + ?Sized,
{
    session
        .set_component_quantity(component.id, plan.new_stock, now)
        .await?;
    component.quantity = plan.new_stock;
    component.last_updated = now;

    let (transaction, merged) = match plan.change {
        TransactionChange::Create(new) => (session.insert_transaction(&new).await?, false),
        TransactionChange::Update(txn) => {
            session.update_transaction(&txn).await?;
            (txn, true)
        }
    };

    log::debug!(
        "ledger: {} {} of component {} -> stock {}, transaction {} {} (pending {})",
        transaction.last_action,
        transaction.transaction_quantity,
        component.id,
        component.quantity,
        transaction.id,
        transaction.status,
        transaction.pending_qty,
    );

    Ok(LedgerOutcome {
        component,
        transaction,
        merged,
    })
}
