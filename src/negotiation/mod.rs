//! Negotiation Ledger
//!
//! Stores guarantee-slot requests and the append-only negotiation message
//! log, and owns the request state machine.

pub mod model;
pub mod service;

pub use model::{
    AcceptNegotiationDto, BudgetType, CreateRequestDto, GuaranteeSlotRequest, MessageKind,
    NegotiationMessage, PostMessageDto, RequestStatus, RequestWithMessages,
};
pub use service::NegotiationService;
