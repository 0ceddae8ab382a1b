use std::sync::Arc;

use crate::{
    database::Database,
    ledger::Ledger,
    utils::{CredentialCheck, SessionKeys},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ledger: Ledger,
    pub keys: SessionKeys,
    pub credentials: Arc<dyn CredentialCheck>,
}

impl AppState {
    pub fn new(db: Database, keys: SessionKeys, credentials: Arc<dyn CredentialCheck>) -> Self {
        Self {
            ledger: Ledger::new(db.clone()),
            db,
            keys,
            credentials,
        }
    }
}
