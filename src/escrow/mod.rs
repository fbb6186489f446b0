//! Escrow Funding Unit
//!
//! Converts an accepted negotiation into a funded guarantee slot plus a
//! holding record, performing the atomic balance debit.

pub mod model;
pub mod service;

pub use model::{GuaranteeSlot, Holding, HoldingStatus, RejectSlotDto, SlotStatus};
pub use service::EscrowService;
