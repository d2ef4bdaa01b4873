pub mod catalog;
pub mod transaction;

pub use catalog::{Currency, PaymentMethod, Selection, SelectionError};
pub use transaction::{
    PaymentData, Transaction, TransactionData, TransactionRecord, TransactionStatus,
};
