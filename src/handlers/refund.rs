//! Refund HTTP handlers - both initiation paths and resolution

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::EngineError;
use crate::handlers::Principal;
use crate::refund::{ConfirmRefundDto, InitiateRefundDto, RefundRequest, RefundRequestDto};
use crate::state::AppState;

/// POST /api/slots/:id/refunds/initiate - seller-initiated refund
pub async fn initiate_refund(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
    Json(dto): Json<InitiateRefundDto>,
) -> Result<(StatusCode, Json<RefundRequest>), EngineError> {
    dto.validate()?;

    let request = state
        .refund_service
        .initiate_refund(slot_id, principal.user_id, dto)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /api/slots/:id/refunds - buyer-initiated refund
pub async fn request_refund(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
    Json(dto): Json<RefundRequestDto>,
) -> Result<(StatusCode, Json<RefundRequest>), EngineError> {
    dto.validate()?;

    let request = state
        .refund_service
        .request_refund(slot_id, principal.user_id, dto)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /api/slots/:id/refunds/:refund_id/confirm - resolve a pending request
pub async fn confirm_refund(
    State(state): State<AppState>,
    principal: Principal,
    Path((slot_id, refund_id)): Path<(Uuid, Uuid)>,
    Json(dto): Json<ConfirmRefundDto>,
) -> Result<Json<RefundRequest>, EngineError> {
    let request = state
        .refund_service
        .confirm_refund(slot_id, refund_id, principal.user_id, dto)
        .await?;

    Ok(Json(request))
}

/// GET /api/slots/:id/refunds - refund attempts for a slot
pub async fn list_refund_requests(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Vec<RefundRequest>>, EngineError> {
    let requests = state
        .refund_service
        .list_refund_requests(slot_id, principal.user_id)
        .await?;

    Ok(Json(requests))
}
