//! Refund workflow tests - both initiation paths and resolution

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::PgPool;
    use uuid::Uuid;

    use rankpact_server::campaign::{CampaignService, GUARANTEE_SERVICE_TYPE};
    use rankpact_server::dispatch::{Notifier, RankChecker};
    use rankpact_server::error::EngineError;
    use rankpact_server::escrow::{EscrowService, SlotStatus};
    use rankpact_server::ledger::LedgerService;
    use rankpact_server::models::ActorRole;
    use rankpact_server::negotiation::{
        AcceptNegotiationDto, BudgetType, CreateRequestDto, NegotiationService,
    };
    use rankpact_server::refund::{
        buyer_refundable, seller_default_refund, ConfirmRefundDto, InitiateRefundDto,
        RefundRequestDto, RefundService, RefundStatus,
    };
    use rankpact_server::settlement::{ConfirmRankDto, SettlementService};

    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/rankpact_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    /// Full pipeline up to one settled day: 10,000/day x 10, period 30,
    /// buyer funded from 200,000. Returns (slot_id, buyer_id, seller_id).
    async fn settled_slot(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
        let campaign_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
        let buyer_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO campaigns (id, seller_id, service_type, guarantee_unit,
                                   min_guarantee_price, max_guarantee_price, is_active, created_at)
            VALUES ($1, $2, $3, 'day', 1000, 100000, TRUE, $4)
            "#,
        )
        .bind(campaign_id)
        .bind(seller_id)
        .bind(GUARANTEE_SERVICE_TYPE)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO balance_accounts (user_id, paid_balance, free_balance) VALUES ($1, 200000, 0)",
        )
        .bind(buyer_id)
        .execute(pool)
        .await
        .unwrap();

        let negotiation =
            NegotiationService::new(pool.clone(), CampaignService::new(pool.clone()), Notifier::spawn(None));
        let request = negotiation
            .create_request(
                buyer_id,
                CreateRequestDto {
                    campaign_id,
                    target_rank: 5,
                    guarantee_count: 10,
                    guarantee_period: Some(30),
                    initial_budget: 10_000,
                    budget_type: BudgetType::Daily,
                    keyword_id: None,
                    starts_on: None,
                    ends_on: None,
                    buyer_reason: None,
                },
            )
            .await
            .unwrap();
        negotiation
            .accept(
                request.id,
                seller_id,
                AcceptNegotiationDto {
                    final_daily_amount: 10_000,
                    final_count: 10,
                    final_budget_type: BudgetType::Daily,
                    final_total_amount: None,
                    final_rank: None,
                    final_period: None,
                },
            )
            .await
            .unwrap();

        let escrow = EscrowService::new(pool.clone(), Notifier::spawn(None), RankChecker::new(None));
        let slot = escrow.purchase(request.id, buyer_id).await.unwrap();
        escrow.approve_slot(slot.id, seller_id).await.unwrap();

        SettlementService::new(pool.clone(), Notifier::spawn(None))
            .confirm_rank_achievement(
                slot.id,
                seller_id,
                ConfirmRankDto {
                    achieved_rank: 3,
                    note: None,
                },
            )
            .await
            .unwrap();

        (slot.id, buyer_id, seller_id)
    }

    fn refund_service(pool: PgPool) -> RefundService {
        RefundService::new(pool, Notifier::spawn(None))
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_seller_initiated_refund_approved_by_buyer() {
        let pool = setup_test_db().await;
        let (slot_id, buyer_id, seller_id) = settled_slot(&pool).await;
        let service = refund_service(pool.clone());

        // Default refund = 110,000 - ceil(10,000 * 1 * 1.10)
        let request = service
            .initiate_refund(
                slot_id,
                seller_id,
                InitiateRefundDto {
                    reason: "inventory withdrawn".to_string(),
                    amount: None,
                },
            )
            .await
            .expect("initiate_refund should succeed");

        assert_eq!(request.amount, 99_000);
        assert_eq!(request.status, RefundStatus::Pending);
        assert_eq!(request.requested_by, ActorRole::Seller);
        assert_eq!(request.next_actor(), ActorRole::Buyer);

        // No funds move before confirmation.
        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 90_000);

        let slot_status = sqlx::query_scalar::<_, SlotStatus>(
            "SELECT status FROM guarantee_slots WHERE id = $1",
        )
        .bind(slot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(slot_status, SlotStatus::RefundInProgress);

        // Buyer approves; the unearned remainder comes back to the wallet.
        let approved = service
            .confirm_refund(
                slot_id,
                request.id,
                buyer_id,
                ConfirmRefundDto {
                    approve: true,
                    rejection_reason: None,
                },
            )
            .await
            .expect("confirm_refund should succeed");
        assert_eq!(approved.status, RefundStatus::Approved);

        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 90_000 + 99_000);

        let slot_status = sqlx::query_scalar::<_, SlotStatus>(
            "SELECT status FROM guarantee_slots WHERE id = $1",
        )
        .bind(slot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(slot_status, SlotStatus::Refunded);

        // Conservation: seller holding + buyer holding + refund == total.
        let (buyer_side, seller_side) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT buyer_holding_amount, seller_holding_amount FROM holdings WHERE slot_id = $1",
        )
        .bind(slot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(buyer_side + seller_side + 99_000, 110_000);

        // A second approval attempt must not double-refund.
        let again = service
            .confirm_refund(
                slot_id,
                request.id,
                buyer_id,
                ConfirmRefundDto {
                    approve: true,
                    rejection_reason: None,
                },
            )
            .await;
        assert!(matches!(again, Err(EngineError::RequestNotPending)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_rejected_refund_restores_active_slot() {
        let pool = setup_test_db().await;
        let (slot_id, buyer_id, seller_id) = settled_slot(&pool).await;
        let service = refund_service(pool.clone());

        let request = service
            .initiate_refund(
                slot_id,
                seller_id,
                InitiateRefundDto {
                    reason: "inventory withdrawn".to_string(),
                    amount: None,
                },
            )
            .await
            .unwrap();

        let rejected = service
            .confirm_refund(
                slot_id,
                request.id,
                buyer_id,
                ConfirmRefundDto {
                    approve: false,
                    rejection_reason: Some("I want the slot to continue".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, RefundStatus::Rejected);
        assert!(rejected.rejection_reason.is_some());

        // The provisional refund-in-progress marker is undone.
        let slot_status = sqlx::query_scalar::<_, SlotStatus>(
            "SELECT status FROM guarantee_slots WHERE id = $1",
        )
        .bind(slot_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(slot_status, SlotStatus::Active);

        // No credit happened.
        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 90_000);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_buyer_initiated_refund_uses_period_denominator() {
        let pool = setup_test_db().await;
        let (slot_id, buyer_id, seller_id) = settled_slot(&pool).await;
        let service = refund_service(pool.clone());

        let request = service
            .request_refund(
                slot_id,
                buyer_id,
                RefundRequestDto {
                    reason: "results not as advertised".to_string(),
                },
            )
            .await
            .expect("request_refund should succeed");

        // Pro-rata over the 30-day period, not the 10-day count:
        // earned = ceil(110,000 * 1 / 30) = 3,667
        assert_eq!(request.amount, 110_000 - 3_667);
        assert_eq!(request.requested_by, ActorRole::Buyer);
        assert_eq!(request.next_actor(), ActorRole::Seller);

        // Seller approves; the credit lands on the buyer's paid balance.
        let approved = service
            .confirm_refund(
                slot_id,
                request.id,
                seller_id,
                ConfirmRefundDto {
                    approve: true,
                    rejection_reason: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, RefundStatus::Approved);

        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 90_000 + 106_333);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_wrong_party_cannot_resolve() {
        let pool = setup_test_db().await;
        let (slot_id, _buyer_id, seller_id) = settled_slot(&pool).await;
        let service = refund_service(pool.clone());

        let request = service
            .initiate_refund(
                slot_id,
                seller_id,
                InitiateRefundDto {
                    reason: "inventory withdrawn".to_string(),
                    amount: None,
                },
            )
            .await
            .unwrap();

        // The seller initiated, so the seller cannot also confirm.
        let result = service
            .confirm_refund(
                slot_id,
                request.id,
                seller_id,
                ConfirmRefundDto {
                    approve: true,
                    rejection_reason: None,
                },
            )
            .await;
        assert!(matches!(result, Err(EngineError::Unauthorized(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_nothing_to_refund_on_fully_settled_slot() {
        let pool = setup_test_db().await;
        let (slot_id, _buyer_id, seller_id) = settled_slot(&pool).await;
        let service = refund_service(pool.clone());

        // Force a fully settled slot.
        sqlx::query(
            "UPDATE guarantee_slots SET completed_count = guarantee_count, status = 'completed' WHERE id = $1",
        )
        .bind(slot_id)
        .execute(&pool)
        .await
        .unwrap();

        let result = service
            .initiate_refund(
                slot_id,
                seller_id,
                InitiateRefundDto {
                    reason: "wrap up".to_string(),
                    amount: None,
                },
            )
            .await;
        assert!(matches!(result, Err(EngineError::NothingToRefund)));
    }

    #[test]
    fn test_refund_computations_stay_asymmetric() {
        // One settled day out of ten, 30-day period.
        assert_eq!(seller_default_refund(110_000, 10_000, 1), 99_000);
        assert_eq!(buyer_refundable(110_000, 1, 30), 106_333);
    }

    #[test]
    fn test_refund_status_enum() {
        let statuses = vec![
            RefundStatus::Pending,
            RefundStatus::Approved,
            RefundStatus::Rejected,
        ];
        assert_eq!(statuses.len(), 3);

        for status in statuses {
            let json = serde_json::to_string(&status).unwrap();
            assert!(!json.is_empty());
        }
    }
}
