//! Middleware for the engine's HTTP surface
//!
//! Request tracing, security headers, and the principal extractor that
//! consumes the identity provider's trusted headers.

pub mod auth;
mod security;
mod tracing;

pub use auth::Principal;
pub use security::security_headers;
pub use tracing::request_tracing;
