//! Refund route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn refund_routes() -> Router<AppState> {
    Router::new()
        .route("/api/slots/:id/refunds", post(request_refund))
        .route("/api/slots/:id/refunds", get(list_refund_requests))
        .route("/api/slots/:id/refunds/initiate", post(initiate_refund))
        .route("/api/slots/:id/refunds/:refund_id/confirm", post(confirm_refund))
}
