//! Escrow HTTP handlers - funding, approval and rejection

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::EngineError;
use crate::escrow::{GuaranteeSlot, Holding, RejectSlotDto, SlotStatus};
use crate::handlers::Principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListSlotsQuery {
    pub status: Option<SlotStatus>,
}

/// POST /api/requests/:id/purchase - fund an accepted negotiation
pub async fn purchase_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path(request_id): Path<Uuid>,
) -> Result<(StatusCode, Json<GuaranteeSlot>), EngineError> {
    let slot = state
        .escrow_service
        .purchase(request_id, principal.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(slot)))
}

/// POST /api/slots/:id/approve - seller approves a funded slot
pub async fn approve_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<GuaranteeSlot>, EngineError> {
    let slot = state
        .escrow_service
        .approve_slot(slot_id, principal.user_id)
        .await?;

    Ok(Json(slot))
}

/// POST /api/slots/:id/reject - seller rejects a funded slot
pub async fn reject_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
    Json(dto): Json<RejectSlotDto>,
) -> Result<Json<GuaranteeSlot>, EngineError> {
    dto.validate()?;

    let slot = state
        .escrow_service
        .reject_slot(slot_id, principal.user_id, dto.reason)
        .await?;

    Ok(Json(slot))
}

/// GET /api/slots - list the principal's slots
pub async fn list_slots(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListSlotsQuery>,
) -> Result<Json<Vec<GuaranteeSlot>>, EngineError> {
    let slots = state
        .escrow_service
        .list_slots(principal.user_id, principal.role, query.status)
        .await?;

    Ok(Json(slots))
}

/// GET /api/slots/:id - a single slot
pub async fn get_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<GuaranteeSlot>, EngineError> {
    let slot = state
        .escrow_service
        .get_slot(slot_id, principal.user_id)
        .await?;

    Ok(Json(slot))
}

/// GET /api/slots/:id/holding - the escrow split for a slot
pub async fn get_holding(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Holding>, EngineError> {
    let holding = state
        .escrow_service
        .get_holding(slot_id, principal.user_id)
        .await?;

    Ok(Json(holding))
}
