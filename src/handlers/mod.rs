//! API handlers for the guarantee-slot engine

pub mod balance;
pub mod escrow;
pub mod negotiation;
pub mod refund;
pub mod settlement;

pub use balance::*;
pub use escrow::*;
pub use negotiation::*;
pub use refund::*;
pub use settlement::*;

// Re-export the principal extractor for handler use
pub use crate::middleware::Principal;
