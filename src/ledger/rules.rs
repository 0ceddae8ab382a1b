//! Pure reconciliation rules. Nothing here touches storage.

use chrono::{DateTime, Utc};

use super::{LedgerError, Movement};
use crate::models::{Component, NewTransaction, StockAction, Transaction, TransactionStatus};

/// Status as a total function of the cumulative counters.
pub fn derive_status(qty_issued: i32, qty_returned: i32) -> TransactionStatus {
    if qty_returned == 0 {
        TransactionStatus::Issued
    } else if qty_issued - qty_returned <= 0 {
        TransactionStatus::Completed
    } else {
        TransactionStatus::PartiallyReturned
    }
}

/// Return notes accumulate; each one lands on its own line after whatever was there.
pub fn append_return_note(existing: Option<String>, note: Option<&str>) -> Option<String> {
    match (existing, note) {
        (existing, None) => existing,
        (None, Some(note)) => Some(format!("Return: {note}")),
        (Some(existing), Some(note)) if existing.is_empty() => Some(format!("Return: {note}")),
        (Some(existing), Some(note)) => Some(format!("{existing}\nReturn: {note}")),
    }
}

/// What the last operation did to the component's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub moved: i32,
    pub action: StockAction,
}

impl Transaction {
    fn record_snapshot(&mut self, snapshot: Snapshot, now: DateTime<Utc>) {
        self.quantity_before = snapshot.quantity_before;
        self.quantity_after = snapshot.quantity_after;
        self.transaction_quantity = snapshot.moved;
        self.last_action = snapshot.action;
        self.date = now;
        self.last_updated = now;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionChange {
    Create(NewTransaction),
    Update(Transaction),
}

/// The writes one operation will make, computed before any of them happen.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub new_stock: i32,
    pub change: TransactionChange,
}

pub fn plan_issue(
    component: &Component,
    open: Option<Transaction>,
    movement: &Movement,
    now: DateTime<Utc>,
) -> Result<Plan, LedgerError> {
    let current_stock = component.quantity;
    let quantity = movement.quantity;
    if quantity > current_stock {
        return Err(LedgerError::InsufficientStock {
            requested: quantity,
            available: current_stock,
        });
    }

    let snapshot = Snapshot {
        quantity_before: current_stock,
        quantity_after: current_stock - quantity,
        moved: quantity,
        action: StockAction::Issue,
    };

    let change = match open {
        Some(mut txn) => {
            txn.qty_issued = txn
                .qty_issued
                .checked_add(quantity)
                .ok_or(LedgerError::InvalidQuantity)?;
            txn.pending_qty = txn.qty_issued - txn.qty_returned;
            txn.status = derive_status(txn.qty_issued, txn.qty_returned);
            txn.record_snapshot(snapshot, now);
            // issues replace notes only when new ones are given
            if let Some(notes) = &movement.notes {
                txn.notes = Some(notes.clone());
            }
            TransactionChange::Update(txn)
        }
        None => TransactionChange::Create(NewTransaction {
            component_id: movement.key.component_id,
            lab_id: movement.key.lab_id,
            campus: movement.key.campus.clone(),
            person_name: movement.key.person_name.clone(),
            purpose: movement.key.purpose.clone(),
            qty_issued: quantity,
            qty_returned: 0,
            pending_qty: quantity,
            status: TransactionStatus::Issued,
            issue_date: now,
            quantity_before: snapshot.quantity_before,
            quantity_after: snapshot.quantity_after,
            transaction_quantity: quantity,
            last_action: StockAction::Issue,
            notes: movement.notes.clone(),
        }),
    };

    Ok(Plan {
        new_stock: snapshot.quantity_after,
        change,
    })
}

pub fn plan_return(
    component: &Component,
    open: Option<Transaction>,
    movement: &Movement,
    now: DateTime<Utc>,
) -> Result<Plan, LedgerError> {
    let mut txn = open.ok_or(LedgerError::NoOpenTransaction)?;
    let quantity = movement.quantity;

    let pending = txn.qty_issued - txn.qty_returned;
    if pending <= 0 {
        return Err(LedgerError::NothingPendingToReturn);
    }
    if quantity > pending {
        return Err(LedgerError::ReturnExceedsPending {
            requested: quantity,
            pending,
        });
    }

    let current_stock = component.quantity;
    let quantity_after = current_stock
        .checked_add(quantity)
        .ok_or(LedgerError::InvalidQuantity)?;

    txn.qty_returned += quantity;
    txn.pending_qty = txn.qty_issued - txn.qty_returned;
    txn.status = derive_status(txn.qty_issued, txn.qty_returned);
    txn.record_snapshot(
        Snapshot {
            quantity_before: current_stock,
            quantity_after,
            moved: quantity,
            action: StockAction::Return,
        },
        now,
    );
    txn.notes = append_return_note(txn.notes.take(), movement.notes.as_deref());

    Ok(Plan {
        new_stock: quantity_after,
        change: TransactionChange::Update(txn),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MatchingKey;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    fn component(quantity: i32) -> Component {
        Component {
            id: 7,
            name: "Arduino Uno".into(),
            category_id: 1,
            lab_id: 2,
            quantity,
            min_stock_level: 2,
            unit: Some("pcs".into()),
            description: None,
            component_type: Some("Microcontroller".into()),
            date_added: at(8),
            last_updated: at(8),
        }
    }

    fn movement(quantity: i32, notes: Option<&str>) -> Movement {
        Movement {
            key: MatchingKey {
                component_id: 7,
                lab_id: Some(2),
                campus: Some("North".into()),
                person_name: "Ravi".into(),
                purpose: "Line follower".into(),
            },
            quantity,
            notes: notes.map(str::to_string),
        }
    }

    fn open_txn(qty_issued: i32, qty_returned: i32, notes: Option<&str>) -> Transaction {
        NewTransaction {
            component_id: 7,
            lab_id: Some(2),
            campus: Some("North".into()),
            person_name: "Ravi".into(),
            purpose: "Line follower".into(),
            qty_issued,
            qty_returned,
            pending_qty: qty_issued - qty_returned,
            status: derive_status(qty_issued, qty_returned),
            issue_date: at(9),
            quantity_before: 10,
            quantity_after: 10 - qty_issued,
            transaction_quantity: qty_issued,
            last_action: StockAction::Issue,
            notes: notes.map(str::to_string),
        }
        .into_transaction(41)
    }

    fn updated(plan: Plan) -> Transaction {
        match plan.change {
            TransactionChange::Update(txn) => txn,
            TransactionChange::Create(new) => panic!("expected an update, got {new:?}"),
        }
    }

    #[test]
    fn status_derivation_table() {
        assert_eq!(derive_status(4, 0), TransactionStatus::Issued);
        assert_eq!(derive_status(0, 0), TransactionStatus::Issued);
        assert_eq!(derive_status(10, 3), TransactionStatus::PartiallyReturned);
        assert_eq!(derive_status(7, 7), TransactionStatus::Completed);
        assert_eq!(derive_status(7, 9), TransactionStatus::Completed);
    }

    #[test]
    fn fresh_issue_creates_an_issued_transaction() {
        let plan = plan_issue(&component(10), None, &movement(4, Some("for demo")), at(10)).unwrap();
        assert_eq!(plan.new_stock, 6);
        let TransactionChange::Create(new) = plan.change else {
            panic!("expected a new transaction");
        };
        assert_eq!(new.qty_issued, 4);
        assert_eq!(new.qty_returned, 0);
        assert_eq!(new.pending_qty, 4);
        assert_eq!(new.status, TransactionStatus::Issued);
        assert_eq!((new.quantity_before, new.quantity_after), (10, 6));
        assert_eq!(new.issue_date, at(10));
        assert_eq!(new.notes.as_deref(), Some("for demo"));
    }

    #[test]
    fn issue_merges_and_keeps_old_notes_when_none_given() {
        let plan = plan_issue(&component(6), Some(open_txn(4, 0, Some("first"))), &movement(3, None), at(11))
            .unwrap();
        assert_eq!(plan.new_stock, 3);
        let txn = updated(plan);
        assert_eq!(txn.id, 41);
        assert_eq!(txn.qty_issued, 7);
        assert_eq!(txn.pending_qty, 7);
        assert_eq!(txn.status, TransactionStatus::Issued);
        assert_eq!(txn.notes.as_deref(), Some("first"));
        assert_eq!(txn.transaction_quantity, 3);
        assert_eq!(txn.last_action, StockAction::Issue);
        assert_eq!(txn.issue_date, at(9));
        assert_eq!(txn.last_updated, at(11));
    }

    #[test]
    fn issue_onto_a_partial_return_stays_partial() {
        let txn = updated(
            plan_issue(&component(8), Some(open_txn(10, 3, None)), &movement(2, Some("more")), at(11)).unwrap(),
        );
        assert_eq!(txn.qty_issued, 12);
        assert_eq!(txn.pending_qty, 9);
        assert_eq!(txn.status, TransactionStatus::PartiallyReturned);
        assert_eq!(txn.notes.as_deref(), Some("more"));
    }

    #[test]
    fn issue_beyond_stock_is_refused() {
        let err = plan_issue(&component(5), None, &movement(20, None), at(10)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { requested: 20, available: 5 }));
    }

    #[test]
    fn issue_of_entire_stock_is_allowed() {
        let plan = plan_issue(&component(5), None, &movement(5, None), at(10)).unwrap();
        assert_eq!(plan.new_stock, 0);
    }

    #[test]
    fn partial_then_full_return() {
        let txn = updated(plan_return(&component(0), Some(open_txn(10, 0, None)), &movement(3, None), at(12)).unwrap());
        assert_eq!(txn.qty_returned, 3);
        assert_eq!(txn.pending_qty, 7);
        assert_eq!(txn.status, TransactionStatus::PartiallyReturned);
        assert_eq!((txn.quantity_before, txn.quantity_after), (0, 3));

        let plan = plan_return(&component(3), Some(txn), &movement(7, None), at(13)).unwrap();
        assert_eq!(plan.new_stock, 10);
        let txn = updated(plan);
        assert_eq!(txn.pending_qty, 0);
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert_eq!(txn.last_action, StockAction::Return);
    }

    #[test]
    fn return_requires_an_open_transaction() {
        let err = plan_return(&component(3), None, &movement(1, None), at(12)).unwrap_err();
        assert!(matches!(err, LedgerError::NoOpenTransaction));
    }

    #[test]
    fn return_with_nothing_pending_is_refused() {
        let mut txn = open_txn(4, 4, None);
        txn.status = TransactionStatus::PartiallyReturned;
        let err = plan_return(&component(3), Some(txn), &movement(1, None), at(12)).unwrap_err();
        assert!(matches!(err, LedgerError::NothingPendingToReturn));
    }

    #[test]
    fn return_beyond_pending_is_refused() {
        let err = plan_return(&component(3), Some(open_txn(10, 3, None)), &movement(8, None), at(12)).unwrap_err();
        assert!(matches!(err, LedgerError::ReturnExceedsPending { requested: 8, pending: 7 }));
    }

    #[test]
    fn return_notes_are_appended() {
        let txn = updated(
            plan_return(&component(0), Some(open_txn(4, 0, Some("issued for lab 3"))), &movement(1, Some("one bent pin")), at(12))
                .unwrap(),
        );
        assert_eq!(txn.notes.as_deref(), Some("issued for lab 3\nReturn: one bent pin"));

        let txn = updated(plan_return(&component(1), Some(txn), &movement(1, None), at(13)).unwrap());
        assert_eq!(txn.notes.as_deref(), Some("issued for lab 3\nReturn: one bent pin"));
    }

    #[test]
    fn append_return_note_cases() {
        assert_eq!(append_return_note(None, None), None);
        assert_eq!(append_return_note(None, Some("ok")).as_deref(), Some("Return: ok"));
        assert_eq!(append_return_note(Some(String::new()), Some("ok")).as_deref(), Some("Return: ok"));
        assert_eq!(append_return_note(Some("a".into()), None).as_deref(), Some("a"));
        assert_eq!(append_return_note(Some("a".into()), Some("b")).as_deref(), Some("a\nReturn: b"));
    }
}
