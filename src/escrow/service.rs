//! Escrow service layer - funding, approval and rejection of slots

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{NotificationEvent, Notifier, RankChecker};
use crate::error::{EngineError, EngineResult};
use crate::escrow::{GuaranteeSlot, Holding, HoldingStatus, SlotStatus};
use crate::inquiry;
use crate::ledger;
use crate::models::{ActorRole, BalanceBucket};
use crate::money;
use crate::negotiation::{GuaranteeSlotRequest, RequestStatus};

/// Escrow service converting accepted negotiations into funded slots
#[derive(Clone)]
pub struct EscrowService {
    db_pool: PgPool,
    notifier: Notifier,
    rank_checker: RankChecker,
}

impl EscrowService {
    pub fn new(db_pool: PgPool, notifier: Notifier, rank_checker: RankChecker) -> Self {
        Self {
            db_pool,
            notifier,
            rank_checker,
        }
    }

    /// Fund an accepted negotiation: debit the buyer's paid balance and
    /// create the slot and its holding in one transaction.
    pub async fn purchase(&self, request_id: Uuid, buyer_id: Uuid) -> EngineResult<GuaranteeSlot> {
        let mut tx = self.db_pool.begin().await?;

        let request = sqlx::query_as::<_, GuaranteeSlotRequest>(
            "SELECT * FROM slot_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("request {}", request_id)))?;

        if request.buyer_id != buyer_id {
            return Err(EngineError::Unauthorized(
                "only the buyer can fund the request".to_string(),
            ));
        }

        if !request.status.is_fundable() {
            return Err(EngineError::RequestNotFundable(format!(
                "request is {}",
                request.status.label()
            )));
        }

        let daily_amount = request.final_daily_amount.ok_or_else(|| {
            EngineError::RequestNotFundable("final daily amount is not set".to_string())
        })?;

        let total = money::escrow_total(daily_amount, request.guarantee_count);

        // Only the paid bucket is eligible for escrow funding.
        let account = ledger::paid_account_for_update(&mut *tx, buyer_id).await?;
        if account.paid_balance < total {
            return Err(EngineError::InsufficientFunds {
                required: total,
                available: account.paid_balance,
            });
        }

        ledger::debit_paid(&mut *tx, buyer_id, total).await?;

        let slot = sqlx::query_as::<_, GuaranteeSlot>(
            r#"
            INSERT INTO guarantee_slots (
                id, request_id, campaign_id, buyer_id, seller_id, target_rank,
                guarantee_count, daily_guarantee_amount, total_amount,
                completed_count, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.id)
        .bind(request.campaign_id)
        .bind(request.buyer_id)
        .bind(request.seller_id)
        .bind(request.target_rank)
        .bind(request.guarantee_count)
        .bind(daily_amount)
        .bind(total)
        .bind(SlotStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO holdings (slot_id, buyer_holding_amount, seller_holding_amount, status, updated_at)
            VALUES ($1, $2, 0, $3, $4)
            "#,
        )
        .bind(slot.id)
        .bind(total)
        .bind(HoldingStatus::Holding)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        ledger::append_history(
            &mut *tx,
            buyer_id,
            BalanceBucket::Paid,
            -total,
            "guarantee_slot_purchase",
            Some(slot.id),
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE slot_requests
            SET status = $1, final_total_amount = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(RequestStatus::Purchased)
        .bind(total)
        .bind(Utc::now())
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.notifier.notify(
            slot.seller_id,
            NotificationEvent::PurchaseAwaitingApproval { slot_id: slot.id },
        );

        Ok(slot)
    }

    /// Approve a funded slot. Approving a rejected slot is a reversal:
    /// the rejection metadata is cleared and the slot returns to pending
    /// without notification or money movement.
    pub async fn approve_slot(&self, slot_id: Uuid, seller_id: Uuid) -> EngineResult<GuaranteeSlot> {
        let mut tx = self.db_pool.begin().await?;

        let slot = self.slot_for_update(&mut tx, slot_id).await?;

        if slot.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can approve the slot".to_string(),
            ));
        }

        if slot.status == SlotStatus::Rejected {
            let reverted = sqlx::query_as::<_, GuaranteeSlot>(
                r#"
                UPDATE guarantee_slots
                SET status = $1, rejection_reason = NULL, rejected_by = NULL,
                    rejected_at = NULL, updated_at = $2
                WHERE id = $3
                RETURNING *
                "#,
            )
            .bind(SlotStatus::Pending)
            .bind(Utc::now())
            .bind(slot.id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            return Ok(reverted);
        }

        if slot.status != SlotStatus::Pending {
            return Err(EngineError::Validation(format!(
                "slot is {} and cannot be approved",
                slot.status.label()
            )));
        }

        let approved = sqlx::query_as::<_, GuaranteeSlot>(
            "UPDATE guarantee_slots SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(SlotStatus::Active)
        .bind(Utc::now())
        .bind(slot.id)
        .fetch_one(&mut *tx)
        .await?;

        inquiry::ensure_thread(&mut *tx, &approved).await?;

        tx.commit().await?;

        let keyword_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT keyword_id FROM slot_requests WHERE id = $1",
        )
        .bind(approved.request_id)
        .fetch_one(&self.db_pool)
        .await
        .unwrap_or(None);

        self.rank_checker
            .trigger(approved.id, keyword_id, approved.target_rank);

        self.notifier.notify(
            approved.buyer_id,
            NotificationEvent::SlotApproved { slot_id: approved.id },
        );

        Ok(approved)
    }

    /// Reject a funded slot. No money moves; the rejection is reversible
    /// via [`Self::approve_slot`].
    pub async fn reject_slot(
        &self,
        slot_id: Uuid,
        seller_id: Uuid,
        reason: String,
    ) -> EngineResult<GuaranteeSlot> {
        let mut tx = self.db_pool.begin().await?;

        let slot = self.slot_for_update(&mut tx, slot_id).await?;

        if slot.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can reject the slot".to_string(),
            ));
        }

        if slot.status != SlotStatus::Pending {
            return Err(EngineError::Validation(format!(
                "slot is {} and cannot be rejected",
                slot.status.label()
            )));
        }

        let rejected = sqlx::query_as::<_, GuaranteeSlot>(
            r#"
            UPDATE guarantee_slots
            SET status = $1, rejection_reason = $2, rejected_by = $3,
                rejected_at = $4, updated_at = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(SlotStatus::Rejected)
        .bind(&reason)
        .bind(seller_id)
        .bind(Utc::now())
        .bind(slot.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.notifier.notify(
            rejected.buyer_id,
            NotificationEvent::SlotRejected {
                slot_id: rejected.id,
                reason,
            },
        );

        Ok(rejected)
    }

    /// Get a slot, restricted to its participants.
    pub async fn get_slot(&self, slot_id: Uuid, viewer_id: Uuid) -> EngineResult<GuaranteeSlot> {
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

        Ok(slot)
    }

    /// Get the holding for a slot, restricted to its participants.
    pub async fn get_holding(&self, slot_id: Uuid, viewer_id: Uuid) -> EngineResult<Holding> {
        let slot = self.get_slot(slot_id, viewer_id).await?;

        let holding = sqlx::query_as::<_, Holding>("SELECT * FROM holdings WHERE slot_id = $1")
            .bind(slot.id)
            .fetch_one(&self.db_pool)
            .await?;

        Ok(holding)
    }

    /// List a principal's slots, optionally filtered by status.
    pub async fn list_slots(
        &self,
        user_id: Uuid,
        role: ActorRole,
        status: Option<SlotStatus>,
    ) -> EngineResult<Vec<GuaranteeSlot>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM guarantee_slots WHERE ");

        match role {
            ActorRole::Buyer => query_builder.push("buyer_id = "),
            ActorRole::Seller => query_builder.push("seller_id = "),
        };
        query_builder.push_bind(user_id);

        if let Some(status) = status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }

        query_builder.push(" ORDER BY created_at DESC LIMIT 100");

        let slots = query_builder
            .build_query_as::<GuaranteeSlot>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(slots)
    }

    async fn slot_for_update(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slot_id: Uuid,
    ) -> EngineResult<GuaranteeSlot> {
        sqlx::query_as::<_, GuaranteeSlot>(
            "SELECT * FROM guarantee_slots WHERE id = $1 FOR UPDATE",
        )
        .bind(slot_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("slot {}", slot_id)))
    }
}
