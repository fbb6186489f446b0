//! Refund models and the two refund computations
//!
//! The seller path prices earned days off the daily amount; the buyer
//! path prorates the total over the guarantee period. The asymmetry is
//! deliberate and preserved from the source system, so the two
//! computations live side by side under their own names.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::ActorRole;
use crate::money;

/// Refund request lifecycle; one pending state serves both paths, with
/// `requested_by` determining who resolves it.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "refund_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Approved,
    Rejected,
}

/// One attempt to terminate a slot early
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct RefundRequest {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub requested_by: ActorRole,
    pub reason: String,
    pub amount: i64,
    pub status: RefundStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RefundRequest {
    /// The actor who must resolve a pending request.
    pub fn next_actor(&self) -> ActorRole {
        self.requested_by.counterparty()
    }
}

/// Default refund for the seller-initiated path: the unearned remainder
/// after pricing confirmed days at the VAT-inclusive daily amount.
pub fn seller_default_refund(total_amount: i64, daily_amount: i64, completed_count: i32) -> i64 {
    let earned = money::vat_inclusive(daily_amount * completed_count as i64);
    (total_amount - earned).max(0)
}

/// Refund for the buyer-initiated path: earned-so-far is the slot total
/// prorated over the guarantee period (days), not the guarantee count.
pub fn buyer_refundable(total_amount: i64, completed_count: i32, period_days: i32) -> i64 {
    let earned = money::ceil_to_unit(money::ceil_div(
        total_amount * completed_count as i64,
        period_days as i64,
    ));
    (total_amount - earned).max(0)
}

/// Request DTO for the seller-initiated path
#[derive(Debug, Deserialize, Validate)]
pub struct InitiateRefundDto {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    /// Explicit refund amount; computed from completed days when absent.
    pub amount: Option<i64>,
}

/// Request DTO for the buyer-initiated path
#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequestDto {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Request DTO for resolving a pending refund request
#[derive(Debug, Deserialize)]
pub struct ConfirmRefundDto {
    pub approve: bool,
    pub rejection_reason: Option<String>,
}
