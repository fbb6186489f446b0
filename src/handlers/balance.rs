//! Balance HTTP handlers
//!
//! Read-only view over the balance ledger; top-ups live elsewhere.

use axum::{extract::State, Json};

use crate::error::EngineError;
use crate::handlers::Principal;
use crate::ledger::{BalanceAccount, BalanceHistoryEntry};
use crate::state::AppState;

/// GET /api/balance - the principal's balance account
pub async fn get_balance(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<BalanceAccount>, EngineError> {
    let account = state.ledger_service.get_account(principal.user_id).await?;

    Ok(Json(account))
}

/// GET /api/balance/history - the principal's balance history
pub async fn balance_history(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<BalanceHistoryEntry>>, EngineError> {
    let entries = state
        .ledger_service
        .history_for_user(principal.user_id)
        .await?;

    Ok(Json(entries))
}
