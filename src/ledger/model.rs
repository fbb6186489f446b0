//! Balance ledger models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::BalanceBucket;

/// Per-user balance record with paid/free buckets
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BalanceAccount {
    pub user_id: Uuid,
    pub paid_balance: i64,
    pub free_balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Append-only history entry written alongside every debit/credit
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct BalanceHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bucket: BalanceBucket,
    pub delta: i64,
    pub reason: String,
    pub slot_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
