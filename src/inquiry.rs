//! 1:1 inquiry threads
//!
//! Slot approval guarantees the buyer and seller a direct line: at most
//! one open thread per slot, created idempotently.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::escrow::GuaranteeSlot;

/// Create the slot's inquiry thread if none exists yet. The unique index
/// on slot_id makes the insert idempotent.
pub async fn ensure_thread(conn: &mut PgConnection, slot: &GuaranteeSlot) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inquiry_threads (id, slot_id, campaign_id, buyer_id, seller_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (slot_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(slot.id)
    .bind(slot.campaign_id)
    .bind(slot.buyer_id)
    .bind(slot.seller_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}
