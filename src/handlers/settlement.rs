//! Settlement HTTP handlers - daily confirmation and manual completion

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::EngineError;
use crate::escrow::GuaranteeSlot;
use crate::handlers::Principal;
use crate::settlement::{CompleteSlotDto, ConfirmRankDto, Settlement};
use crate::state::AppState;

/// POST /api/slots/:id/settlements - confirm today's rank achievement
pub async fn confirm_rank_achievement(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
    Json(dto): Json<ConfirmRankDto>,
) -> Result<(StatusCode, Json<Settlement>), EngineError> {
    dto.validate()?;

    let settlement = state
        .settlement_service
        .confirm_rank_achievement(slot_id, principal.user_id, dto)
        .await?;

    Ok((StatusCode::CREATED, Json(settlement)))
}

/// POST /api/slots/:id/complete - manual early completion
pub async fn complete_slot(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
    Json(dto): Json<CompleteSlotDto>,
) -> Result<Json<GuaranteeSlot>, EngineError> {
    dto.validate()?;

    let slot = state
        .settlement_service
        .complete_slot(slot_id, principal.user_id, dto)
        .await?;

    Ok(Json(slot))
}

/// GET /api/slots/:id/settlements - settlement history for a slot
pub async fn list_settlements(
    State(state): State<AppState>,
    principal: Principal,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Vec<Settlement>>, EngineError> {
    let settlements = state
        .settlement_service
        .list_settlements(slot_id, principal.user_id)
        .await?;

    Ok(Json(settlements))
}
