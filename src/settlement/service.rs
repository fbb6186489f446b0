//! Settlement service layer - daily confirmation and manual completion
//!
//! All money movement here happens inside one transaction holding the
//! slot row lock, so concurrent confirmations for the same slot serialize
//! and the per-day uniqueness check is race-free. The unique index on
//! (slot_id, confirmed_on) backstops it at the store level.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{NotificationEvent, Notifier};
use crate::error::{EngineError, EngineResult};
use crate::escrow::{GuaranteeSlot, Holding, HoldingStatus, SlotStatus};
use crate::ledger;
use crate::models::BalanceBucket;
use crate::settlement::{CompleteSlotDto, ConfirmRankDto, Settlement};

/// Settlement service advancing slot completion day by day
#[derive(Clone)]
pub struct SettlementService {
    db_pool: PgPool,
    notifier: Notifier,
}

impl SettlementService {
    pub fn new(db_pool: PgPool, notifier: Notifier) -> Self {
        Self { db_pool, notifier }
    }

    /// Confirm today's rank achievement for an active slot.
    ///
    /// Inserts the settlement row, and when the guarantee was met moves
    /// one daily amount from the buyer side to the seller side of the
    /// holding and advances `completed_count`.
    pub async fn confirm_rank_achievement(
        &self,
        slot_id: Uuid,
        seller_id: Uuid,
        dto: ConfirmRankDto,
    ) -> EngineResult<Settlement> {
        let mut tx = self.db_pool.begin().await?;

        let slot = sqlx::query_as::<_, GuaranteeSlot>(
            "SELECT * FROM guarantee_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("slot {}", slot_id)))?;

        if slot.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can confirm rank achievement".to_string(),
            ));
        }

        if slot.status != SlotStatus::Active {
            return Err(EngineError::SlotNotActive(format!(
                "slot is {}",
                slot.status.label()
            )));
        }

        let today = Utc::now().date_naive();

        let already_confirmed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM settlements WHERE slot_id = $1 AND confirmed_on = $2)",
        )
        .bind(slot.id)
        .bind(today)
        .fetch_one(&mut *tx)
        .await?;

        if already_confirmed {
            return Err(EngineError::AlreadyConfirmedToday);
        }

        let guarantee_met = dto.achieved_rank <= slot.target_rank;
        let amount = if guarantee_met {
            slot.daily_guarantee_amount
        } else {
            0
        };

        let settlement = sqlx::query_as::<_, Settlement>(
            r#"
            INSERT INTO settlements (
                id, slot_id, confirmed_on, confirmed_by, target_rank,
                achieved_rank, guarantee_met, amount_moved, note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(slot.id)
        .bind(today)
        .bind(seller_id)
        .bind(slot.target_rank)
        .bind(dto.achieved_rank)
        .bind(guarantee_met)
        .bind(amount)
        .bind(dto.note)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let mut slot_completed = false;

        if guarantee_met {
            let new_completed = slot.completed_count + 1;
            let new_status = if new_completed >= slot.guarantee_count {
                slot_completed = true;
                SlotStatus::Completed
            } else {
                SlotStatus::Active
            };

            sqlx::query(
                r#"
                UPDATE guarantee_slots
                SET completed_count = $1, status = $2, updated_at = $3
                WHERE id = $4
                "#,
            )
            .bind(new_completed)
            .bind(new_status)
            .bind(Utc::now())
            .bind(slot.id)
            .execute(&mut *tx)
            .await?;

            let holding = sqlx::query_as::<_, Holding>(
                "SELECT * FROM holdings WHERE slot_id = $1 FOR UPDATE",
            )
            .bind(slot.id)
            .fetch_one(&mut *tx)
            .await?;

            // The buyer side never goes below zero. A shortfall means the
            // funding arithmetic and the settlement arithmetic disagree,
            // which must be surfaced, not absorbed.
            let transfer = amount.min(holding.buyer_holding_amount);
            if transfer < amount {
                tracing::error!(
                    slot_id = %slot.id,
                    expected = amount,
                    available = holding.buyer_holding_amount,
                    "Holding shortfall during settlement; clamping transfer"
                );
            }

            let holding_status = if slot_completed {
                HoldingStatus::Completed
            } else {
                holding.status
            };

            sqlx::query(
                r#"
                UPDATE holdings
                SET buyer_holding_amount = buyer_holding_amount - $1,
                    seller_holding_amount = seller_holding_amount + $1,
                    status = $2,
                    updated_at = $3
                WHERE slot_id = $4
                "#,
            )
            .bind(transfer)
            .bind(holding_status)
            .bind(Utc::now())
            .bind(slot.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.notifier.notify(
            slot.buyer_id,
            NotificationEvent::RankConfirmed {
                slot_id: slot.id,
                guarantee_met,
            },
        );
        if slot_completed {
            self.notifier.notify(
                slot.buyer_id,
                NotificationEvent::SlotCompleted { slot_id: slot.id },
            );
        }

        Ok(settlement)
    }

    /// Manually complete an active slot ahead of schedule.
    ///
    /// `completed_count` is forced to `guarantee_count` (the slot is
    /// treated as fully earned for bookkeeping). An optional refund amount
    /// is credited to the buyer's paid balance directly, bypassing the
    /// holding split.
    pub async fn complete_slot(
        &self,
        slot_id: Uuid,
        seller_id: Uuid,
        dto: CompleteSlotDto,
    ) -> EngineResult<GuaranteeSlot> {
        let mut tx = self.db_pool.begin().await?;

        let slot = sqlx::query_as::<_, GuaranteeSlot>(
            "SELECT * FROM guarantee_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("slot {}", slot_id)))?;

        if slot.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can complete the slot".to_string(),
            ));
        }

        if slot.status != SlotStatus::Active {
            return Err(EngineError::SlotNotActive(format!(
                "slot is {}",
                slot.status.label()
            )));
        }

        let refund_amount = dto.refund_amount.unwrap_or(0);
        if refund_amount < 0 || refund_amount > slot.total_amount {
            return Err(EngineError::Validation(format!(
                "refund amount must be between 0 and the slot total {}",
                slot.total_amount
            )));
        }

        if slot.completed_count < slot.guarantee_count {
            tracing::warn!(
                slot_id = %slot.id,
                confirmed_days = slot.completed_count,
                guarantee_count = slot.guarantee_count,
                "Manual completion forces full completed_count over fewer confirmed days"
            );
        }

        let completed = sqlx::query_as::<_, GuaranteeSlot>(
            r#"
            UPDATE guarantee_slots
            SET status = $1, completed_count = guarantee_count, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(SlotStatus::Completed)
        .bind(Utc::now())
        .bind(slot.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE holdings SET status = $1, updated_at = $2 WHERE slot_id = $3",
        )
        .bind(HoldingStatus::Completed)
        .bind(Utc::now())
        .bind(slot.id)
        .execute(&mut *tx)
        .await?;

        if refund_amount > 0 {
            // Direct compensating payment, not a holding transfer.
            ledger::credit_paid(&mut *tx, slot.buyer_id, refund_amount).await?;
            ledger::append_history(
                &mut *tx,
                slot.buyer_id,
                BalanceBucket::Paid,
                refund_amount,
                dto.memo.as_deref().unwrap_or("manual_completion_refund"),
                Some(slot.id),
            )
            .await?;
        }

        tx.commit().await?;

        self.notifier.notify(
            completed.buyer_id,
            NotificationEvent::SlotCompleted { slot_id: completed.id },
        );

        Ok(completed)
    }

    /// Settlement history for a slot, restricted to its participants.
    pub async fn list_settlements(
        &self,
        slot_id: Uuid,
        viewer_id: Uuid,
    ) -> EngineResult<Vec<Settlement>> {
        let slot = sqlx::query_as::<_, GuaranteeSlot>("SELECT * FROM guarantee_slots WHERE id = $1")
            .bind(slot_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("slot {}", slot_id)))?;

        if !slot.is_participant(viewer_id) {
            return Err(EngineError::Unauthorized(
                "not a participant of this slot".to_string(),
            ));
        }

        let settlements = sqlx::query_as::<_, Settlement>(
            "SELECT * FROM settlements WHERE slot_id = $1 ORDER BY confirmed_on ASC",
        )
        .bind(slot_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(settlements)
    }
}
