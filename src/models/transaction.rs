use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Issued,
    #[serde(rename = "Partially Returned")]
    PartiallyReturned,
    Completed,
}

impl TransactionStatus {
    /// Statuses a new issue may merge into.
    pub const OPEN: [TransactionStatus; 2] =
        [TransactionStatus::Issued, TransactionStatus::PartiallyReturned];

    /// Column values of [`Self::OPEN`], for binding as a SQL array.
    pub fn open_labels() -> Vec<String> {
        Self::OPEN.iter().map(|s| s.as_str().to_string()).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Issued => "Issued",
            TransactionStatus::PartiallyReturned => "Partially Returned",
            TransactionStatus::Completed => "Completed",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, TransactionStatus::Completed)
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            TransactionStatus::Issued => "issued",
            TransactionStatus::PartiallyReturned => "partial",
            TransactionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value {0:?}")]
pub struct UnknownVariant(pub String);

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Issued" => Ok(TransactionStatus::Issued),
            "Partially Returned" => Ok(TransactionStatus::PartiallyReturned),
            "Completed" => Ok(TransactionStatus::Completed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which operation produced a transaction's snapshot fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockAction {
    Issue,
    Return,
}

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::Issue => "issue",
            StockAction::Return => "return",
        }
    }
}

impl fmt::Display for StockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockAction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issue" => Ok(StockAction::Issue),
            "return" => Ok(StockAction::Return),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl TryFrom<String> for StockAction {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: i32,
    pub component_id: i32,
    pub lab_id: Option<i32>,
    pub campus: Option<String>,
    pub person_name: String,
    pub purpose: String,
    pub qty_issued: i32,
    pub qty_returned: i32,
    pub pending_qty: i32,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub issue_date: DateTime<Utc>,
    pub date: DateTime<Utc>,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub transaction_quantity: i32,
    #[sqlx(try_from = "String")]
    pub last_action: StockAction,
    pub notes: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Fields of a transaction that does not exist yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub component_id: i32,
    pub lab_id: Option<i32>,
    pub campus: Option<String>,
    pub person_name: String,
    pub purpose: String,
    pub qty_issued: i32,
    pub qty_returned: i32,
    pub pending_qty: i32,
    pub status: TransactionStatus,
    pub issue_date: DateTime<Utc>,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub transaction_quantity: i32,
    pub last_action: StockAction,
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: i32) -> Transaction {
        Transaction {
            id,
            component_id: self.component_id,
            lab_id: self.lab_id,
            campus: self.campus,
            person_name: self.person_name,
            purpose: self.purpose,
            qty_issued: self.qty_issued,
            qty_returned: self.qty_returned,
            pending_qty: self.pending_qty,
            status: self.status,
            issue_date: self.issue_date,
            date: self.issue_date,
            quantity_before: self.quantity_before,
            quantity_after: self.quantity_after,
            transaction_quantity: self.transaction_quantity,
            last_action: self.last_action,
            notes: self.notes,
            last_updated: self.issue_date,
        }
    }
}

/// Listing row: transaction plus component and lab names.
#[derive(Debug, Serialize, FromRow)]
pub struct TransactionDisplay {
    pub id: i32,
    pub component_id: i32,
    pub component_name: String,
    pub lab_name: Option<String>,
    pub campus: Option<String>,
    pub person_name: String,
    pub purpose: String,
    pub qty_issued: i32,
    pub qty_returned: i32,
    pub pending_qty: i32,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub issue_date: DateTime<Utc>,
    pub date: DateTime<Utc>,
    pub transaction_quantity: i32,
    #[sqlx(try_from = "String")]
    pub last_action: StockAction,
    pub notes: Option<String>,
}

impl TransactionDisplay {
    pub fn lab_text(&self) -> &str {
        self.lab_name.as_deref().unwrap_or("-")
    }

    pub fn campus_text(&self) -> &str {
        self.campus.as_deref().unwrap_or("-")
    }

    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or_default()
    }
}
