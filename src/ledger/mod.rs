//! Balance ledger store
//!
//! Durable per-user balance record with paid/free buckets. Mutation
//! functions take a connection so callers compose them into the same
//! transaction as the slot and holding writes.

pub mod model;
pub mod service;

pub use model::{BalanceAccount, BalanceHistoryEntry};
pub use service::{append_history, credit_paid, debit_paid, paid_account_for_update, LedgerService};
