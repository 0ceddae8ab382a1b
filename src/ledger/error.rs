use thiserror::Error;

/// Form fields the ledger insists on before touching stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Lab,
    Component,
    Person,
    Purpose,
}

/// Business-rule failures. Every message is meant to be shown to the user as is.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Quantity must be a whole number greater than zero.")]
    InvalidQuantity,

    #[error("Invalid transaction type.")]
    InvalidTransactionType,

    #[error("{}", missing_field_message(*.0))]
    MissingField(Field),

    #[error("Component not found.")]
    ComponentNotFound,

    #[error("Transaction not found.")]
    TransactionNotFound,

    #[error("Cannot issue {requested} units. Only {available} available in stock.")]
    InsufficientStock { requested: i32, available: i32 },

    #[error(
        "No matching issued transaction found to return against \
         (check Component / Lab / Campus / Person / Purpose)."
    )]
    NoOpenTransaction,

    #[error("No pending quantity left to return for this transaction.")]
    NothingPendingToReturn,

    #[error("Return quantity ({requested}) cannot exceed pending quantity ({pending}).")]
    ReturnExceedsPending { requested: i32, pending: i32 },

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Domain errors are reported back to the form; store errors are not the user's fault.
    pub fn is_domain(&self) -> bool {
        !matches!(self, LedgerError::Store(_))
    }
}

fn missing_field_message(field: Field) -> &'static str {
    match field {
        Field::Lab => "Please select a lab first.",
        Field::Component => "Please select a component.",
        Field::Person | Field::Purpose => "Person and Purpose are required.",
    }
}

/// Infrastructure failure underneath a ledger operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether the whole operation should be replayed from a fresh storage transaction.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db)) => {
                db.code().map_or(false, |code| is_retryable_code(&code))
            }
            StoreError::Database(sqlx::Error::PoolTimedOut) => true,
            StoreError::Database(_) => false,
        }
    }
}

/// serialization_failure, deadlock_detected, and unique_violation (the open-key index).
pub(crate) fn is_retryable_code(code: &str) -> bool {
    matches!(code, "40001" | "40P01" | "23505")
}
