//! Escrow funding tests - atomic debit, slot and holding creation

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::PgPool;
    use uuid::Uuid;

    use rankpact_server::campaign::{CampaignService, GUARANTEE_SERVICE_TYPE};
    use rankpact_server::dispatch::{Notifier, RankChecker};
    use rankpact_server::error::EngineError;
    use rankpact_server::escrow::{EscrowService, HoldingStatus, SlotStatus};
    use rankpact_server::ledger::LedgerService;
    use rankpact_server::money;
    use rankpact_server::negotiation::{
        AcceptNegotiationDto, BudgetType, CreateRequestDto, NegotiationService, RequestStatus,
    };

    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/rankpact_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    async fn seed_campaign(pool: &PgPool) -> (Uuid, Uuid) {
        let campaign_id = Uuid::new_v4();
        let seller_id = Uuid::new_v4();
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
        .expect("Failed to seed campaign");
        (campaign_id, seller_id)
    }

    async fn seed_balance(pool: &PgPool, user_id: Uuid, paid: i64) {
        sqlx::query(
            "INSERT INTO balance_accounts (user_id, paid_balance, free_balance) VALUES ($1, $2, 0)",
        )
        .bind(user_id)
        .bind(paid)
        .execute(pool)
        .await
        .expect("Failed to seed balance");
    }

    /// Create a campaign, negotiate and accept at 10,000/day over 10 days;
    /// returns (request_id, buyer_id, seller_id).
    async fn accepted_request(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
        let (campaign_id, seller_id) = seed_campaign(pool).await;
        let buyer_id = Uuid::new_v4();
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
            .expect("create_request should succeed");

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
            .expect("accept should succeed");

        (request.id, buyer_id, seller_id)
    }

    fn escrow_service(pool: PgPool) -> EscrowService {
        EscrowService::new(pool, Notifier::spawn(None), RankChecker::new(None))
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_purchase_debits_and_splits_escrow() {
        let pool = setup_test_db().await;
        let (request_id, buyer_id, _seller_id) = accepted_request(&pool).await;
        seed_balance(&pool, buyer_id, 200_000).await;

        let escrow = escrow_service(pool.clone());
        let slot = escrow
            .purchase(request_id, buyer_id)
            .await
            .expect("purchase should succeed");

        // total = ceil(10,000 * 10 * 1.10) = 110,000
        assert_eq!(slot.total_amount, 110_000);
        assert_eq!(slot.status, SlotStatus::Pending);
        assert_eq!(slot.completed_count, 0);

        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 90_000);

        let holding = escrow.get_holding(slot.id, buyer_id).await.unwrap();
        assert_eq!(holding.buyer_holding_amount, 110_000);
        assert_eq!(holding.seller_holding_amount, 0);
        assert_eq!(holding.status, HoldingStatus::Holding);

        // The request is terminal after funding.
        let status = sqlx::query_scalar::<_, RequestStatus>(
            "SELECT status FROM slot_requests WHERE id = $1",
        )
        .bind(request_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, RequestStatus::Purchased);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_purchase_fails_on_insufficient_paid_balance() {
        let pool = setup_test_db().await;
        let (request_id, buyer_id, _seller_id) = accepted_request(&pool).await;
        // 50,000 < 110,000; a fat free bucket must not help.
        seed_balance(&pool, buyer_id, 50_000).await;
        sqlx::query("UPDATE balance_accounts SET free_balance = 500000 WHERE user_id = $1")
            .bind(buyer_id)
            .execute(&pool)
            .await
            .unwrap();

        let escrow = escrow_service(pool.clone());
        let result = escrow.purchase(request_id, buyer_id).await;

        assert!(matches!(
            result,
            Err(EngineError::InsufficientFunds {
                required: 110_000,
                available: 50_000
            })
        ));

        // Nothing partially committed: no slot, no holding, no debit.
        let slot_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM guarantee_slots WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(slot_count, 0);

        let account = LedgerService::new(pool.clone())
            .get_account(buyer_id)
            .await
            .unwrap();
        assert_eq!(account.paid_balance, 50_000);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_purchase_requires_accepted_status() {
        let pool = setup_test_db().await;
        let (campaign_id, _seller_id) = seed_campaign(&pool).await;
        let buyer_id = Uuid::new_v4();
        seed_balance(&pool, buyer_id, 200_000).await;

        let negotiation =
            NegotiationService::new(pool.clone(), CampaignService::new(pool.clone()), Notifier::spawn(None));
        let request = negotiation
            .create_request(
                buyer_id,
                CreateRequestDto {
                    campaign_id,
                    target_rank: 5,
                    guarantee_count: 10,
                    guarantee_period: None,
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

        let escrow = escrow_service(pool.clone());
        let result = escrow.purchase(request.id, buyer_id).await;
        assert!(matches!(result, Err(EngineError::RequestNotFundable(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_reject_then_approve_reversal() {
        let pool = setup_test_db().await;
        let (request_id, buyer_id, seller_id) = accepted_request(&pool).await;
        seed_balance(&pool, buyer_id, 200_000).await;

        let escrow = escrow_service(pool.clone());
        let slot = escrow.purchase(request_id, buyer_id).await.unwrap();

        let rejected = escrow
            .reject_slot(slot.id, seller_id, "sold out this month".to_string())
            .await
            .unwrap();
        assert_eq!(rejected.status, SlotStatus::Rejected);
        assert!(rejected.rejection_reason.is_some());

        // Approving a rejected slot is a reversal back to pending.
        let reverted = escrow.approve_slot(slot.id, seller_id).await.unwrap();
        assert_eq!(reverted.status, SlotStatus::Pending);
        assert!(reverted.rejection_reason.is_none());
        assert!(reverted.rejected_at.is_none());

        // A second approval activates the slot.
        let approved = escrow.approve_slot(slot.id, seller_id).await.unwrap();
        assert_eq!(approved.status, SlotStatus::Active);

        // Activation created exactly one inquiry thread.
        let threads = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inquiry_threads WHERE slot_id = $1",
        )
        .bind(slot.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(threads, 1);
    }

    #[test]
    fn test_escrow_total_with_vat() {
        assert_eq!(money::escrow_total(10_000, 10), 110_000);
    }
}
