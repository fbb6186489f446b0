//! Balance ledger operations
//!
//! The free-standing functions run against a borrowed connection so the
//! escrow, settlement and refund services can call them inside their own
//! transactions. `LedgerService` carries the pool for the read surface.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ledger::{BalanceAccount, BalanceHistoryEntry};
use crate::models::BalanceBucket;

/// Lock the user's balance row for the duration of the transaction,
/// creating a zero-balance account on first touch.
pub async fn paid_account_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> EngineResult<BalanceAccount> {
    sqlx::query("INSERT INTO balance_accounts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let account = sqlx::query_as::<_, BalanceAccount>(
        "SELECT * FROM balance_accounts WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(account)
}

/// Debit the paid bucket. The caller must hold the row lock and have
/// verified sufficiency; the guard here is the last line of defense.
pub async fn debit_paid(conn: &mut PgConnection, user_id: Uuid, amount: i64) -> EngineResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE balance_accounts
        SET paid_balance = paid_balance - $1, updated_at = $2
        WHERE user_id = $3 AND paid_balance >= $1
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(EngineError::ConcurrentModification);
    }

    Ok(())
}

/// Credit the paid bucket.
pub async fn credit_paid(conn: &mut PgConnection, user_id: Uuid, amount: i64) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO balance_accounts (user_id, paid_balance, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id)
        DO UPDATE SET paid_balance = balance_accounts.paid_balance + $2, updated_at = $3
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Append a balance-history entry.
pub async fn append_history(
    conn: &mut PgConnection,
    user_id: Uuid,
    bucket: BalanceBucket,
    delta: i64,
    reason: &str,
    slot_id: Option<Uuid>,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO balance_history (id, user_id, bucket, delta, reason, slot_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(bucket)
    .bind(delta)
    .bind(reason)
    .bind(slot_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Read surface over balance accounts and history
#[derive(Clone)]
pub struct LedgerService {
    db_pool: PgPool,
}

impl LedgerService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Get a user's balance account, defaulting to zero balances if the
    /// user has never held funds.
    pub async fn get_account(&self, user_id: Uuid) -> EngineResult<BalanceAccount> {
        let account = sqlx::query_as::<_, BalanceAccount>(
            "SELECT * FROM balance_accounts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(account.unwrap_or(BalanceAccount {
            user_id,
            paid_balance: 0,
            free_balance: 0,
            updated_at: Utc::now(),
        }))
    }

    /// List a user's balance history, newest first.
    pub async fn history_for_user(&self, user_id: Uuid) -> EngineResult<Vec<BalanceHistoryEntry>> {
        let entries = sqlx::query_as::<_, BalanceHistoryEntry>(
            "SELECT * FROM balance_history WHERE user_id = $1 ORDER BY created_at DESC LIMIT 100",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }
}
