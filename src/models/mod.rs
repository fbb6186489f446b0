//! Shared model types used across the engine

use serde::{Deserialize, Serialize};

/// Which side of a contract an actor is on.
///
/// The identity provider resolves the authenticated principal to one of
/// these roles; the engine only ever distinguishes buyer from seller.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "actor_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Buyer,
    Seller,
}

impl ActorRole {
    /// The opposite side of the contract
    pub fn counterparty(&self) -> ActorRole {
        match self {
            ActorRole::Buyer => ActorRole::Seller,
            ActorRole::Seller => ActorRole::Buyer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Buyer => "buyer",
            ActorRole::Seller => "seller",
        }
    }
}

/// Balance bucket a ledger movement applies to. Only the paid bucket is
/// eligible for escrow funding.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "balance_bucket", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BalanceBucket {
    Paid,
    Free,
}
