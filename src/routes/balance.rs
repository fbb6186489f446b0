//! Balance route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn balance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/balance", get(get_balance))
        .route("/api/balance/history", get(balance_history))
}
