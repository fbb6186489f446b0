//! Settlement route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn settlement_routes() -> Router<AppState> {
    Router::new()
        .route("/api/slots/:id/settlements", post(confirm_rank_achievement))
        .route("/api/slots/:id/settlements", get(list_settlements))
        .route("/api/slots/:id/complete", post(complete_slot))
}
