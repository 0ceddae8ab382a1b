//! Stock transaction ledger.
//!
//! Turns an issue or return request plus the component's current stock into
//! updated stock and a created or updated transaction record. The rules live in
//! [`rules`] as pure functions; [`operations`] sequences them against a
//! [`LedgerSession`], which is one storage transaction's worth of access to
//! components and transactions. [`runner`] opens those sessions, commits or
//! rolls them back, and retries conflicts.
//!
//! Invariants held by every operation:
//! - `pending_qty == qty_issued - qty_returned` on every transaction written.
//! - An issue never takes a component's stock below zero.
//! - At most one open (`Issued` / `Partially Returned`) transaction per [`MatchingKey`].
//! - Validation finishes before the first write, so a failed request changes nothing.

pub mod error;
pub mod rules;
pub mod session;
pub mod operations;
pub mod postgres;
pub mod runner;

#[cfg(test)]
pub(crate) mod memory;

pub use error::{Field, LedgerError, StoreError};
pub use operations::LedgerOutcome;
pub use postgres::{PgLedgerSession, PgSessionSource};
pub use runner::{Ledger, LedgerCommand, SessionSource};
pub use session::LedgerSession;

use std::str::FromStr;

/// The tuple that decides whether an issue merges into an existing open transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchingKey {
    pub component_id: i32,
    pub lab_id: Option<i32>,
    pub campus: Option<String>,
    pub person_name: String,
    pub purpose: String,
}

impl MatchingKey {
    pub fn of(txn: &crate::models::Transaction) -> Self {
        Self {
            component_id: txn.component_id,
            lab_id: txn.lab_id,
            campus: txn.campus.clone(),
            person_name: txn.person_name.clone(),
            purpose: txn.purpose.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Issue,
    Return,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Issue => "issue",
            TransactionKind::Return => "return",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "issue" => Ok(TransactionKind::Issue),
            "return" => Ok(TransactionKind::Return),
            _ => Err(LedgerError::InvalidTransactionType),
        }
    }
}

/// An issue or return as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct MovementRequest {
    pub component_id: Option<i32>,
    pub lab_id: Option<i32>,
    pub campus: Option<String>,
    pub person_name: String,
    pub purpose: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// A request that passed field validation. Stock checks still happen against the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub key: MatchingKey,
    pub quantity: i32,
    pub notes: Option<String>,
}

impl MovementRequest {
    /// Checks fields in the order the form reports them: quantity, lab, component, person/purpose.
    pub fn validate(&self) -> Result<Movement, LedgerError> {
        if self.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity);
        }
        let lab_id = self.lab_id.ok_or(LedgerError::MissingField(Field::Lab))?;
        let component_id = self
            .component_id
            .ok_or(LedgerError::MissingField(Field::Component))?;

        let person_name = self.person_name.trim();
        if person_name.is_empty() {
            return Err(LedgerError::MissingField(Field::Person));
        }
        let purpose = self.purpose.trim();
        if purpose.is_empty() {
            return Err(LedgerError::MissingField(Field::Purpose));
        }

        Ok(Movement {
            key: MatchingKey {
                component_id,
                lab_id: Some(lab_id),
                campus: non_blank(self.campus.as_deref()),
                person_name: person_name.to_string(),
                purpose: purpose.to_string(),
            },
            quantity: self.quantity,
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

/// Parses the quantity field of a form. Blank counts as zero and is rejected like any other non-positive value.
pub fn parse_quantity(raw: &str) -> Result<i32, LedgerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LedgerError::InvalidQuantity);
    }
    match raw.parse::<i32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(LedgerError::InvalidQuantity),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> MovementRequest {
        MovementRequest {
            component_id: Some(1),
            lab_id: Some(2),
            campus: Some("  ".to_string()),
            person_name: " Asha ".to_string(),
            purpose: "Robotics club".to_string(),
            quantity: 3,
            notes: Some(String::new()),
        }
    }

    #[test]
    fn validate_normalizes_the_key() {
        let movement = request().validate().unwrap();
        assert_eq!(movement.key.campus, None);
        assert_eq!(movement.key.person_name, "Asha");
        assert_eq!(movement.key.lab_id, Some(2));
        assert_eq!(movement.notes, None);
    }

    #[test]
    fn quantity_is_checked_before_anything_else() {
        let req = MovementRequest { quantity: 0, lab_id: None, ..request() };
        assert!(matches!(req.validate(), Err(LedgerError::InvalidQuantity)));
    }

    #[test]
    fn missing_fields_are_reported_in_form_order() {
        let req = MovementRequest { lab_id: None, component_id: None, ..request() };
        assert!(matches!(req.validate(), Err(LedgerError::MissingField(Field::Lab))));

        let req = MovementRequest { component_id: None, ..request() };
        assert!(matches!(req.validate(), Err(LedgerError::MissingField(Field::Component))));

        let req = MovementRequest { person_name: "   ".into(), ..request() };
        assert!(matches!(req.validate(), Err(LedgerError::MissingField(Field::Person))));

        let req = MovementRequest { purpose: String::new(), ..request() };
        assert!(matches!(req.validate(), Err(LedgerError::MissingField(Field::Purpose))));
    }

    #[test]
    fn parse_quantity_rejects_junk() {
        assert_eq!(parse_quantity(" 12 ").unwrap(), 12);
        assert!(parse_quantity("").is_err());
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-4").is_err());
        assert!(parse_quantity("four").is_err());
        assert!(parse_quantity("2.5").is_err());
    }

    #[test]
    fn transaction_kind_from_form_value() {
        assert_eq!("issue".parse::<TransactionKind>().unwrap(), TransactionKind::Issue);
        assert_eq!("return".parse::<TransactionKind>().unwrap(), TransactionKind::Return);
        assert!(matches!(
            "transfer".parse::<TransactionKind>(),
            Err(LedgerError::InvalidTransactionType)
        ));
    }
}
