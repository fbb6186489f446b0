//! Negotiation service layer - request state machine and message log

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::campaign::CampaignService;
use crate::dispatch::{NotificationEvent, Notifier};
use crate::error::{EngineError, EngineResult};
use crate::models::ActorRole;
use crate::negotiation::{
    AcceptNegotiationDto, CreateRequestDto, GuaranteeSlotRequest, NegotiationMessage,
    PostMessageDto, RequestStatus, RequestWithMessages,
};

/// Negotiation service owning the request state machine
#[derive(Clone)]
pub struct NegotiationService {
    db_pool: PgPool,
    campaigns: CampaignService,
    notifier: Notifier,
}

impl NegotiationService {
    pub fn new(db_pool: PgPool, campaigns: CampaignService, notifier: Notifier) -> Self {
        Self {
            db_pool,
            campaigns,
            notifier,
        }
    }

    /// Open a new negotiation against a guarantee campaign.
    pub async fn create_request(
        &self,
        buyer_id: Uuid,
        dto: CreateRequestDto,
    ) -> EngineResult<GuaranteeSlotRequest> {
        dto.validate_terms().map_err(EngineError::Validation)?;

        let campaign = self.campaigns.get_terms(dto.campaign_id).await?;

        let daily = dto.daily_equivalent();
        if daily < campaign.min_guarantee_price || daily > campaign.max_guarantee_price {
            return Err(EngineError::InvalidCampaign(format!(
                "proposed daily price {} is outside the campaign bounds {}..{}",
                daily, campaign.min_guarantee_price, campaign.max_guarantee_price
            )));
        }

        let request = sqlx::query_as::<_, GuaranteeSlotRequest>(
            r#"
            INSERT INTO slot_requests (
                id, campaign_id, buyer_id, seller_id, target_rank, guarantee_count,
                guarantee_period, initial_budget, budget_type, status, keyword_id,
                starts_on, ends_on, buyer_reason, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(campaign.id)
        .bind(buyer_id)
        .bind(campaign.seller_id)
        .bind(dto.target_rank)
        .bind(dto.guarantee_count)
        .bind(dto.guarantee_period)
        .bind(dto.initial_budget)
        .bind(dto.budget_type)
        .bind(RequestStatus::Requested)
        .bind(dto.keyword_id)
        .bind(dto.starts_on)
        .bind(dto.ends_on)
        .bind(dto.buyer_reason)
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await?;

        self.notifier.notify(
            request.seller_id,
            NotificationEvent::RequestCreated {
                request_id: request.id,
            },
        );

        Ok(request)
    }

    /// Append a negotiation message; proposal kinds force the request back
    /// to `negotiating`.
    pub async fn post_message(
        &self,
        request_id: Uuid,
        sender_id: Uuid,
        dto: PostMessageDto,
    ) -> EngineResult<NegotiationMessage> {
        let mut tx = self.db_pool.begin().await?;

        let request = sqlx::query_as::<_, GuaranteeSlotRequest>(
            "SELECT * FROM slot_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("request {}", request_id)))?;

        let sender_role = request
            .role_of(sender_id)
            .ok_or_else(|| EngineError::Unauthorized("not a participant of this negotiation".to_string()))?;

        if dto.kind.reopens_negotiation() && !request.status.is_negotiable() {
            return Err(EngineError::NotNegotiable(format!(
                "request is {}",
                request.status.label()
            )));
        }

        let message = sqlx::query_as::<_, NegotiationMessage>(
            r#"
            INSERT INTO negotiation_messages (
                id, request_id, sender_id, sender_role, kind, body,
                proposed_daily_amount, proposed_count, proposed_period, proposed_rank,
                is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.id)
        .bind(sender_id)
        .bind(sender_role)
        .bind(dto.kind)
        .bind(&dto.body)
        .bind(dto.proposed_daily_amount)
        .bind(dto.proposed_count)
        .bind(dto.proposed_period)
        .bind(dto.proposed_rank)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        if dto.kind.reopens_negotiation() && request.status != RequestStatus::Negotiating {
            sqlx::query(
                "UPDATE slot_requests SET status = $1, updated_at = $2 WHERE id = $3",
            )
            .bind(RequestStatus::Negotiating)
            .bind(Utc::now())
            .bind(request.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        // Notification is best-effort and never fails the write.
        if let Some(counterparty) = request.counterparty_of(sender_id) {
            self.notifier.notify(
                counterparty,
                NotificationEvent::MessagePosted {
                    request_id: request.id,
                    message_id: message.id,
                },
            );
        }

        Ok(message)
    }

    /// Accept the negotiation, fixing the final terms. Only the seller may
    /// accept; a purchased request is no longer negotiable.
    pub async fn accept(
        &self,
        request_id: Uuid,
        seller_id: Uuid,
        dto: AcceptNegotiationDto,
    ) -> EngineResult<GuaranteeSlotRequest> {
        let mut tx = self.db_pool.begin().await?;

        let request = sqlx::query_as::<_, GuaranteeSlotRequest>(
            "SELECT * FROM slot_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("request {}", request_id)))?;

        if request.seller_id != seller_id {
            return Err(EngineError::Unauthorized(
                "only the seller can accept a negotiation".to_string(),
            ));
        }

        if !request.status.is_negotiable() {
            return Err(EngineError::NotNegotiable(format!(
                "request is {}",
                request.status.label()
            )));
        }

        let updated = sqlx::query_as::<_, GuaranteeSlotRequest>(
            r#"
            UPDATE slot_requests
            SET status = $1,
                final_daily_amount = $2,
                guarantee_count = $3,
                budget_type = $4,
                final_total_amount = $5,
                target_rank = COALESCE($6, target_rank),
                guarantee_period = COALESCE($7, guarantee_period),
                updated_at = $8
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(RequestStatus::Accepted)
        .bind(dto.final_daily_amount)
        .bind(dto.final_count)
        .bind(dto.final_budget_type)
        .bind(dto.final_total_amount)
        .bind(dto.final_rank)
        .bind(dto.final_period)
        .bind(Utc::now())
        .bind(request.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.notifier.notify(
            updated.buyer_id,
            NotificationEvent::NegotiationAccepted {
                request_id: updated.id,
            },
        );

        Ok(updated)
    }

    /// Buyer withdraws an unfunded negotiation.
    pub async fn cancel_request(&self, request_id: Uuid, buyer_id: Uuid) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE slot_requests
            SET status = $1, updated_at = $2
            WHERE id = $3 AND buyer_id = $4 AND status != $5
            "#,
        )
        .bind(RequestStatus::Cancelled)
        .bind(Utc::now())
        .bind(request_id)
        .bind(buyer_id)
        .bind(RequestStatus::Purchased)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a funded request from a wrong owner for the caller.
            let request = self.fetch_request(request_id).await?;
            if request.buyer_id != buyer_id {
                return Err(EngineError::Unauthorized(
                    "only the buyer can cancel the request".to_string(),
                ));
            }
            return Err(EngineError::NotNegotiable("request is purchased".to_string()));
        }

        Ok(())
    }

    /// Mark the counterparty's messages as read. The read flag is the only
    /// permitted message mutation.
    pub async fn mark_messages_read(&self, request_id: Uuid, reader_id: Uuid) -> EngineResult<u64> {
        let request = self.fetch_request(request_id).await?;
        if !request.is_participant(reader_id) {
            return Err(EngineError::Unauthorized(
                "not a participant of this negotiation".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            UPDATE negotiation_messages
            SET is_read = TRUE
            WHERE request_id = $1 AND sender_id != $2 AND is_read = FALSE
            "#,
        )
        .bind(request_id)
        .bind(reader_id)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Get a request with its full message log.
    pub async fn get_request(
        &self,
        request_id: Uuid,
        viewer_id: Uuid,
    ) -> EngineResult<RequestWithMessages> {
        let request = self.fetch_request(request_id).await?;
        if !request.is_participant(viewer_id) {
            return Err(EngineError::Unauthorized(
                "not a participant of this negotiation".to_string(),
            ));
        }

        let messages = sqlx::query_as::<_, NegotiationMessage>(
            "SELECT * FROM negotiation_messages WHERE request_id = $1 ORDER BY created_at ASC",
        )
        .bind(request_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(RequestWithMessages { request, messages })
    }

    /// List a principal's requests, optionally filtered by status.
    pub async fn list_requests(
        &self,
        user_id: Uuid,
        role: ActorRole,
        status: Option<RequestStatus>,
    ) -> EngineResult<Vec<GuaranteeSlotRequest>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM slot_requests WHERE ");

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

        let requests = query_builder
            .build_query_as::<GuaranteeSlotRequest>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(requests)
    }

    async fn fetch_request(&self, request_id: Uuid) -> EngineResult<GuaranteeSlotRequest> {
        sqlx::query_as::<_, GuaranteeSlotRequest>("SELECT * FROM slot_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("request {}", request_id)))
    }
}
