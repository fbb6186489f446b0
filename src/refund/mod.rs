//! Refund Workflow
//!
//! Both refund-initiation paths (buyer self-service, seller-initiated
//! with buyer confirmation) and the compensating ledger credit.

pub mod model;
pub mod service;

pub use model::{
    buyer_refundable, seller_default_refund, ConfirmRefundDto, InitiateRefundDto, RefundRequest,
    RefundRequestDto, RefundStatus,
};
pub use service::RefundService;
