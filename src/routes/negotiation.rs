//! Negotiation route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn negotiation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/requests", post(create_request))
        .route("/api/requests", get(list_requests))
        .route("/api/requests/:id", get(get_request))
        .route("/api/requests/:id/messages", post(post_message))
        .route("/api/requests/:id/messages/read", post(mark_messages_read))
        .route("/api/requests/:id/accept", post(accept_negotiation))
        .route("/api/requests/:id/cancel", post(cancel_request))
}
