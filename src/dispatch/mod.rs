//! Fire-and-forget collaborators
//!
//! Notification delivery and ranking-check triggering are decoupled from
//! the financial transactions: callers commit first, then hand events to
//! the dispatcher. A failure here is logged and swallowed, never
//! propagated to the caller.

pub mod notifier;
pub mod rank_check;

pub use notifier::{NotificationEvent, Notifier};
pub use rank_check::RankChecker;
