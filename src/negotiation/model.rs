//! Negotiation models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::models::ActorRole;

/// Negotiation request lifecycle
///
/// `requested → negotiating → {accepted | rejected}`; `accepted →
/// purchased` is terminal and owned by the escrow funding unit. A
/// renegotiation message reopens `negotiating` even after `accepted`;
/// fundability is gated on status alone, so the final-* fields are never
/// cleared physically.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Requested,
    Negotiating,
    Accepted,
    Rejected,
    Cancelled,
    Purchased,
}

impl RequestStatus {
    /// Only an accepted request may be funded.
    pub fn is_fundable(&self) -> bool {
        matches!(self, RequestStatus::Accepted)
    }

    /// Purchased and cancelled requests cannot re-enter negotiation.
    pub fn is_negotiable(&self) -> bool {
        !matches!(self, RequestStatus::Purchased | RequestStatus::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Requested => "requested",
            RequestStatus::Negotiating => "negotiating",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Purchased => "purchased",
        }
    }
}

/// Negotiation message kinds; proposal-carrying kinds force the request
/// back to `negotiating`.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "message_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    PriceProposal,
    CounterOffer,
    RenegotiationRequest,
}

impl MessageKind {
    /// Whether this kind reopens negotiation on the request.
    pub fn reopens_negotiation(&self) -> bool {
        matches!(
            self,
            MessageKind::PriceProposal | MessageKind::CounterOffer | MessageKind::RenegotiationRequest
        )
    }
}

/// How the initial budget figure is to be read
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "budget_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    Daily,
    Total,
}

/// One negotiation between a buyer and a seller
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct GuaranteeSlotRequest {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub target_rank: i32,
    pub guarantee_count: i32,
    pub guarantee_period: Option<i32>,
    pub initial_budget: i64,
    pub budget_type: BudgetType,
    pub status: RequestStatus,
    pub final_daily_amount: Option<i64>,
    pub final_total_amount: Option<i64>,
    /// Reference into the keyword catalog; manual keyword entry is the
    /// absence of a reference, never a sentinel value.
    pub keyword_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub buyer_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuaranteeSlotRequest {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<ActorRole> {
        if self.buyer_id == user_id {
            Some(ActorRole::Buyer)
        } else if self.seller_id == user_id {
            Some(ActorRole::Seller)
        } else {
            None
        }
    }

    pub fn counterparty_of(&self, user_id: Uuid) -> Option<Uuid> {
        match self.role_of(user_id)? {
            ActorRole::Buyer => Some(self.seller_id),
            ActorRole::Seller => Some(self.buyer_id),
        }
    }
}

/// Append-only negotiation log entry; the read flag is the only mutable
/// field.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct NegotiationMessage {
    pub id: Uuid,
    pub request_id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: ActorRole,
    pub kind: MessageKind,
    pub body: String,
    pub proposed_daily_amount: Option<i64>,
    pub proposed_count: Option<i32>,
    pub proposed_period: Option<i32>,
    pub proposed_rank: Option<i32>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for opening a negotiation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestDto {
    pub campaign_id: Uuid,
    #[validate(range(min = 1))]
    pub target_rank: i32,
    #[validate(range(min = 1))]
    pub guarantee_count: i32,
    pub guarantee_period: Option<i32>,
    #[validate(range(min = 1))]
    pub initial_budget: i64,
    pub budget_type: BudgetType,
    pub keyword_id: Option<Uuid>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub buyer_reason: Option<String>,
}

impl CreateRequestDto {
    /// Cross-field checks that validator derive cannot express
    pub fn validate_terms(&self) -> Result<(), String> {
        if let Some(period) = self.guarantee_period {
            if period < self.guarantee_count {
                return Err("Guarantee period cannot be shorter than the guarantee count".to_string());
            }
        }
        if let (Some(starts), Some(ends)) = (self.starts_on, self.ends_on) {
            if ends < starts {
                return Err("End date must not precede start date".to_string());
            }
        }
        Ok(())
    }

    /// Daily-equivalent price used against the campaign bounds
    pub fn daily_equivalent(&self) -> i64 {
        match self.budget_type {
            BudgetType::Daily => self.initial_budget,
            BudgetType::Total => self.initial_budget / self.guarantee_count as i64,
        }
    }
}

/// Request DTO for posting a negotiation message
#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageDto {
    pub kind: MessageKind,
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
    pub proposed_daily_amount: Option<i64>,
    pub proposed_count: Option<i32>,
    pub proposed_period: Option<i32>,
    pub proposed_rank: Option<i32>,
}

/// Request DTO for accepting a negotiation and fixing the final terms
#[derive(Debug, Deserialize, Validate)]
pub struct AcceptNegotiationDto {
    #[validate(range(min = 1))]
    pub final_daily_amount: i64,
    #[validate(range(min = 1))]
    pub final_count: i32,
    pub final_budget_type: BudgetType,
    pub final_total_amount: Option<i64>,
    pub final_rank: Option<i32>,
    pub final_period: Option<i32>,
}

/// A request together with its message log
#[derive(Debug, Serialize)]
pub struct RequestWithMessages {
    pub request: GuaranteeSlotRequest,
    pub messages: Vec<NegotiationMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fundability_is_gated_on_status() {
        assert!(RequestStatus::Accepted.is_fundable());
        assert!(!RequestStatus::Negotiating.is_fundable());
        assert!(!RequestStatus::Purchased.is_fundable());
        assert!(!RequestStatus::Requested.is_fundable());
    }

    #[test]
    fn test_negotiability() {
        assert!(RequestStatus::Requested.is_negotiable());
        assert!(RequestStatus::Accepted.is_negotiable());
        assert!(RequestStatus::Rejected.is_negotiable());
        assert!(!RequestStatus::Purchased.is_negotiable());
        assert!(!RequestStatus::Cancelled.is_negotiable());
    }

    #[test]
    fn test_proposal_kinds_reopen_negotiation() {
        assert!(MessageKind::PriceProposal.reopens_negotiation());
        assert!(MessageKind::CounterOffer.reopens_negotiation());
        assert!(MessageKind::RenegotiationRequest.reopens_negotiation());
        assert!(!MessageKind::Message.reopens_negotiation());
    }

    #[test]
    fn test_create_dto_cross_field_validation() {
        let mut dto = CreateRequestDto {
            campaign_id: Uuid::new_v4(),
            target_rank: 5,
            guarantee_count: 10,
            guarantee_period: Some(30),
            initial_budget: 10_000,
            budget_type: BudgetType::Daily,
            keyword_id: None,
            starts_on: None,
            ends_on: None,
            buyer_reason: None,
        };
        assert!(dto.validate_terms().is_ok());

        dto.guarantee_period = Some(5);
        assert!(dto.validate_terms().is_err());
    }

    #[test]
    fn test_daily_equivalent() {
        let dto = CreateRequestDto {
            campaign_id: Uuid::new_v4(),
            target_rank: 5,
            guarantee_count: 10,
            guarantee_period: None,
            initial_budget: 100_000,
            budget_type: BudgetType::Total,
            keyword_id: None,
            starts_on: None,
            ends_on: None,
            buyer_reason: None,
        };
        assert_eq!(dto.daily_equivalent(), 10_000);
    }
}
