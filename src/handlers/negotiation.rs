//! Negotiation HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::EngineError;
use crate::handlers::Principal;
use crate::models::ActorRole;
use crate::negotiation::{
    AcceptNegotiationDto, CreateRequestDto, GuaranteeSlotRequest, NegotiationMessage,
    PostMessageDto, RequestStatus, RequestWithMessages,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
}

/// POST /api/requests - open a negotiation (buyer only)
pub async fn create_request(
    State(state): State<AppState>,
    principal: Principal,
    Json(dto): Json<CreateRequestDto>,
) -> Result<(StatusCode, Json<GuaranteeSlotRequest>), EngineError> {
    if principal.role != ActorRole::Buyer {
        return Err(EngineError::Unauthorized(
            "only buyers can open a negotiation".to_string(),
        ));
    }
    dto.validate()?;

    let request = state
        .negotiation_service
        .create_request(principal.user_id, dto)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /api/requests - list the principal's negotiations
pub async fn list_requests(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<GuaranteeSlotRequest>>, EngineError> {
    let requests = state
        .negotiation_service
        .list_requests(principal.user_id, principal.role, query.status)
        .await?;

    Ok(Json(requests))
}

/// GET /api/requests/:id - a negotiation with its message log
pub async fn get_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestWithMessages>, EngineError> {
    let request = state
        .negotiation_service
        .get_request(request_id, principal.user_id)
        .await?;

    Ok(Json(request))
}

/// POST /api/requests/:id/messages - append a negotiation message
pub async fn post_message(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
    Json(dto): Json<PostMessageDto>,
) -> Result<(StatusCode, Json<NegotiationMessage>), EngineError> {
    dto.validate()?;

    let message = state
        .negotiation_service
        .post_message(request_id, principal.user_id, dto)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/requests/:id/accept - accept the negotiation (seller only)
pub async fn accept_negotiation(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
    Json(dto): Json<AcceptNegotiationDto>,
) -> Result<Json<GuaranteeSlotRequest>, EngineError> {
    dto.validate()?;

    let request = state
        .negotiation_service
        .accept(request_id, principal.user_id, dto)
        .await?;

    Ok(Json(request))
}

/// POST /api/requests/:id/cancel - withdraw the negotiation (buyer only)
pub async fn cancel_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
) -> Result<StatusCode, EngineError> {
    state
        .negotiation_service
        .cancel_request(request_id, principal.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/requests/:id/messages/read - mark counterparty messages read
pub async fn mark_messages_read(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let updated = state
        .negotiation_service
        .mark_messages_read(request_id, principal.user_id)
        .await?;

    Ok(Json(serde_json::json!({ "marked_read": updated })))
}
