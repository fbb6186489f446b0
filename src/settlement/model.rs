//! Settlement models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

/// One row per (slot, calendar day); the unique index on
/// (slot_id, confirmed_on) is the idempotency boundary for daily
/// confirmation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Settlement {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub confirmed_on: NaiveDate,
    pub confirmed_by: Uuid,
    pub target_rank: i32,
    pub achieved_rank: i32,
    pub guarantee_met: bool,
    /// 0 when the guarantee was not met.
    pub amount_moved: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for confirming a day's rank achievement
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmRankDto {
    #[validate(range(min = 1))]
    pub achieved_rank: i32,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Request DTO for manual early completion
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteSlotDto {
    #[validate(length(max = 1000))]
    pub memo: Option<String>,
    #[validate(range(min = 0))]
    pub refund_amount: Option<i64>,
}
