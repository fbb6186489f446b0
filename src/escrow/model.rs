//! Guarantee slot and holding models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Funded-slot lifecycle
///
/// `pending → active → {completed | refund_in_progress → refunded}`;
/// `rejected` is reachable from `pending` and reversible back to it.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "slot_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Pending,
    Active,
    Rejected,
    Completed,
    RefundInProgress,
    Refunded,
}

impl SlotStatus {
    /// Whether a refund may be initiated from this state.
    pub fn is_refundable_from(&self) -> bool {
        matches!(self, SlotStatus::Active | SlotStatus::Completed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotStatus::Pending => "pending",
            SlotStatus::Active => "active",
            SlotStatus::Rejected => "rejected",
            SlotStatus::Completed => "completed",
            SlotStatus::RefundInProgress => "refund in progress",
            SlotStatus::Refunded => "refunded",
        }
    }
}

/// The funded contract
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct GuaranteeSlot {
    pub id: Uuid,
    pub request_id: Uuid,
    pub campaign_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub target_rank: i32,
    pub guarantee_count: i32,
    pub daily_guarantee_amount: i64,
    /// VAT-inclusive; fixed at funding time and never recomputed.
    pub total_amount: i64,
    pub completed_count: i32,
    pub status: SlotStatus,
    pub rejection_reason: Option<String>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuaranteeSlot {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

/// Holding status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "holding_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HoldingStatus {
    Holding,
    Completed,
}

/// Escrow split for one slot: funds not yet earned stay on the buyer
/// side, funds earned through settlement accumulate on the seller side.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Holding {
    pub slot_id: Uuid,
    pub buyer_holding_amount: i64,
    pub seller_holding_amount: i64,
    pub status: HoldingStatus,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for rejecting a purchased slot
#[derive(Debug, Deserialize, Validate)]
pub struct RejectSlotDto {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refundable_states() {
        assert!(SlotStatus::Active.is_refundable_from());
        assert!(SlotStatus::Completed.is_refundable_from());
        assert!(!SlotStatus::Pending.is_refundable_from());
        assert!(!SlotStatus::Refunded.is_refundable_from());
        assert!(!SlotStatus::RefundInProgress.is_refundable_from());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&SlotStatus::RefundInProgress).unwrap(),
            "\"refund_in_progress\""
        );
    }
}
