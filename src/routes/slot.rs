//! Slot route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn slot_routes() -> Router<AppState> {
    Router::new()
        .route("/api/requests/:id/purchase", post(purchase_slot))
        .route("/api/slots", get(list_slots))
        .route("/api/slots/:id", get(get_slot))
        .route("/api/slots/:id/holding", get(get_holding))
        .route("/api/slots/:id/approve", post(approve_slot))
        .route("/api/slots/:id/reject", post(reject_slot))
}
