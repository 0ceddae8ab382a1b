pub mod lab;
pub mod category;
pub mod component;
pub mod transaction;

pub use lab::{Lab, LabComponentCount};
pub use category::{Category, CategorySummary};
pub use component::{Component, ComponentDisplay, ComponentOption, StockState};
pub use transaction::{
    NewTransaction, StockAction, Transaction, TransactionDisplay, TransactionStatus,
};
