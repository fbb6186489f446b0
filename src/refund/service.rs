//! Refund service layer - initiation and resolution of refund requests
//!
//! Refund requests are individually keyed rows; every resolution goes
//! through a status-guarded update so a concurrent second resolution
//! fails instead of double-refunding.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch::{NotificationEvent, Notifier};
use crate::error::{EngineError, EngineResult};
use crate::escrow::{GuaranteeSlot, Holding, HoldingStatus, SlotStatus};
use crate::ledger;
use crate::models::{ActorRole, BalanceBucket};
use crate::refund::{
    buyer_refundable, seller_default_refund, ConfirmRefundDto, InitiateRefundDto, RefundRequest,
    RefundRequestDto, RefundStatus,
};

/// Refund service owning the refund-request sub-ledger
#[derive(Clone)]
pub struct RefundService {
    db_pool: PgPool,
    notifier: Notifier,
}

impl RefundService {
    pub fn new(db_pool: PgPool, notifier: Notifier) -> Self {
        Self { db_pool, notifier }
    }

    /// Seller-initiated refund. No funds move until the buyer confirms.
    pub async fn initiate_refund(
        &self,
        slot_id: Uuid,
        seller_id: Uuid,
        dto: InitiateRefundDto,
    ) -> EngineResult<RefundRequest> {
        let mut tx = self.db_pool.begin().await?;

        let slot = self.slot_for_update(&mut tx, slot_id).await?;

        if slot.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can initiate this refund".to_string(),
            ));
        }

        if !slot.status.is_refundable_from() {
            return Err(EngineError::SlotNotActive(format!(
                "slot is {}",
                slot.status.label()
            )));
        }

        let amount = match dto.amount {
            Some(amount) => {
                if amount <= 0 || amount > slot.total_amount {
                    return Err(EngineError::Validation(format!(
                        "refund amount must be between 1 and the slot total {}",
                        slot.total_amount
                    )));
                }
                amount
            }
            None => {
                let computed = seller_default_refund(
                    slot.total_amount,
                    slot.daily_guarantee_amount,
                    slot.completed_count,
                );
                if computed == 0 {
                    return Err(EngineError::NothingToRefund);
                }
                computed
            }
        };

        let request = self
            .insert_request(&mut tx, &slot, ActorRole::Seller, &dto.reason, amount)
            .await?;

        tx.commit().await?;

        self.notifier.notify(
            slot.buyer_id,
            NotificationEvent::RefundConfirmationRequired {
                slot_id: slot.id,
                refund_request_id: request.id,
            },
        );

        Ok(request)
    }

    /// Buyer-initiated refund, queued for seller approval. The earned
    /// denominator here is the guarantee period, not the guarantee count.
    pub async fn request_refund(
        &self,
        slot_id: Uuid,
        buyer_id: Uuid,
        dto: RefundRequestDto,
    ) -> EngineResult<RefundRequest> {
        let mut tx = self.db_pool.begin().await?;

        let slot = self.slot_for_update(&mut tx, slot_id).await?;

        if slot.buyer_id != buyer_id {
            return Err(EngineError::Unauthorized(
                "only the buyer can request this refund".to_string(),
            ));
        }

        if !slot.status.is_refundable_from() {
            return Err(EngineError::SlotNotActive(format!(
                "slot is {}",
                slot.status.label()
            )));
        }

        let period = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT guarantee_period FROM slot_requests WHERE id = $1",
        )
        .bind(slot.request_id)
        .fetch_one(&mut *tx)
        .await?
        .unwrap_or(slot.guarantee_count);

        let amount = buyer_refundable(slot.total_amount, slot.completed_count, period);
        if amount == 0 {
            return Err(EngineError::NothingToRefund);
        }

        let request = self
            .insert_request(&mut tx, &slot, ActorRole::Buyer, &dto.reason, amount)
            .await?;

        tx.commit().await?;

        self.notifier.notify(
            slot.seller_id,
            NotificationEvent::RefundApprovalRequested {
                slot_id: slot.id,
                refund_request_id: request.id,
            },
        );

        Ok(request)
    }

    /// Resolve a pending refund request. The approver must be the
    /// counterparty of whoever requested it.
    pub async fn confirm_refund(
        &self,
        slot_id: Uuid,
        refund_request_id: Uuid,
        approver_id: Uuid,
        dto: ConfirmRefundDto,
    ) -> EngineResult<RefundRequest> {
        let mut tx = self.db_pool.begin().await?;

        let slot = self.slot_for_update(&mut tx, slot_id).await?;

        let request = sqlx::query_as::<_, RefundRequest>(
            "SELECT * FROM refund_requests WHERE id = $1 AND slot_id = $2 FOR UPDATE",
        )
        .bind(refund_request_id)
        .bind(slot.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("refund request {}", refund_request_id)))?;

        if request.status != RefundStatus::Pending {
            return Err(EngineError::RequestNotPending);
        }

        let expected_approver = match request.next_actor() {
            ActorRole::Buyer => slot.buyer_id,
            ActorRole::Seller => slot.seller_id,
        };
        if approver_id != expected_approver {
            return Err(EngineError::Unauthorized(format!(
                "this refund request is resolved by the {}",
                request.next_actor().as_str()
            )));
        }

        let initiator_id = match request.requested_by {
            ActorRole::Buyer => slot.buyer_id,
            ActorRole::Seller => slot.seller_id,
        };

        let resolved = if dto.approve {
            self.approve(&mut tx, &slot, &request).await?
        } else {
            self.reject(&mut tx, &slot, &request, dto.rejection_reason)
                .await?
        };

        tx.commit().await?;

        let event = if dto.approve {
            NotificationEvent::RefundApproved {
                slot_id: slot.id,
                refund_request_id: resolved.id,
            }
        } else {
            NotificationEvent::RefundRejected {
                slot_id: slot.id,
                refund_request_id: resolved.id,
            }
        };
        self.notifier.notify(initiator_id, event);

        Ok(resolved)
    }

    /// List the refund attempts for a slot, restricted to participants.
    pub async fn list_refund_requests(
        &self,
        slot_id: Uuid,
        viewer_id: Uuid,
    ) -> EngineResult<Vec<RefundRequest>> {
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

        let requests = sqlx::query_as::<_, RefundRequest>(
            "SELECT * FROM refund_requests WHERE slot_id = $1 ORDER BY created_at ASC",
        )
        .bind(slot_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(requests)
    }

    async fn approve(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slot: &GuaranteeSlot,
        request: &RefundRequest,
    ) -> EngineResult<RefundRequest> {
        // Status-guarded update: a concurrent resolution loses here.
        let approved = sqlx::query_as::<_, RefundRequest>(
            r#"
            UPDATE refund_requests
            SET status = $1, resolved_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(RefundStatus::Approved)
        .bind(Utc::now())
        .bind(request.id)
        .bind(RefundStatus::Pending)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(EngineError::RequestNotPending)?;

        ledger::credit_paid(&mut **tx, slot.buyer_id, approved.amount).await?;
        ledger::append_history(
            &mut **tx,
            slot.buyer_id,
            BalanceBucket::Paid,
            approved.amount,
            "guarantee_slot_refund",
            Some(slot.id),
        )
        .await?;

        // Zero the unearned remainder out of the holding bookkeeping.
        let holding = sqlx::query_as::<_, Holding>(
            "SELECT * FROM holdings WHERE slot_id = $1 FOR UPDATE",
        )
        .bind(slot.id)
        .fetch_one(&mut **tx)
        .await?;

        let removed = approved.amount.min(holding.buyer_holding_amount);
        if removed < approved.amount {
            tracing::error!(
                slot_id = %slot.id,
                refund = approved.amount,
                available = holding.buyer_holding_amount,
                "Refund exceeds the buyer-side holding; clamping the holding release"
            );
        }

        sqlx::query(
            r#"
            UPDATE holdings
            SET buyer_holding_amount = buyer_holding_amount - $1, status = $2, updated_at = $3
            WHERE slot_id = $4
            "#,
        )
        .bind(removed)
        .bind(HoldingStatus::Completed)
        .bind(Utc::now())
        .bind(slot.id)
        .execute(&mut **tx)
        .await?;

        sqlx::query("UPDATE guarantee_slots SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(SlotStatus::Refunded)
            .bind(Utc::now())
            .bind(slot.id)
            .execute(&mut **tx)
            .await?;

        Ok(approved)
    }

    async fn reject(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slot: &GuaranteeSlot,
        request: &RefundRequest,
        rejection_reason: Option<String>,
    ) -> EngineResult<RefundRequest> {
        let rejected = sqlx::query_as::<_, RefundRequest>(
            r#"
            UPDATE refund_requests
            SET status = $1, rejection_reason = $2, resolved_at = $3
            WHERE id = $4 AND status = $5
            RETURNING *
            "#,
        )
        .bind(RefundStatus::Rejected)
        .bind(rejection_reason)
        .bind(Utc::now())
        .bind(request.id)
        .bind(RefundStatus::Pending)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(EngineError::RequestNotPending)?;

        // Undo the provisional refund-in-progress marker.
        sqlx::query("UPDATE guarantee_slots SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(SlotStatus::Active)
            .bind(Utc::now())
            .bind(slot.id)
            .execute(&mut **tx)
            .await?;

        Ok(rejected)
    }

    async fn insert_request(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        slot: &GuaranteeSlot,
        requested_by: ActorRole,
        reason: &str,
        amount: i64,
    ) -> EngineResult<RefundRequest> {
        let request = sqlx::query_as::<_, RefundRequest>(
            r#"
            INSERT INTO refund_requests (id, slot_id, requested_by, reason, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(slot.id)
        .bind(requested_by)
        .bind(reason)
        .bind(amount)
        .bind(RefundStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("UPDATE guarantee_slots SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(SlotStatus::RefundInProgress)
            .bind(Utc::now())
            .bind(slot.id)
            .execute(&mut **tx)
            .await?;

        Ok(request)
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
