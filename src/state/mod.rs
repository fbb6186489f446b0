//! Shared application state

use sqlx::PgPool;

use crate::escrow::EscrowService;
use crate::ledger::LedgerService;
use crate::negotiation::NegotiationService;
use crate::refund::RefundService;
use crate::settlement::SettlementService;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub negotiation_service: NegotiationService,
    pub escrow_service: EscrowService,
    pub settlement_service: SettlementService,
    pub refund_service: RefundService,
    pub ledger_service: LedgerService,
    pub db_pool: PgPool,
}

impl AppState {
    pub fn new(
        negotiation_service: NegotiationService,
        escrow_service: EscrowService,
        settlement_service: SettlementService,
        refund_service: RefundService,
        ledger_service: LedgerService,
        db_pool: PgPool,
    ) -> Self {
        Self {
            negotiation_service,
            escrow_service,
            settlement_service,
            refund_service,
            ledger_service,
            db_pool,
        }
    }
}
