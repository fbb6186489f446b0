//! Principal extraction
//!
//! The identity provider authenticates upstream and forwards the
//! principal as trusted `X-User-Id` / `X-User-Role` headers; this engine
//! only resolves them into a typed [`Principal`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::ActorRole;

/// Authenticated principal for the current request
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: ActorRole,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = EngineError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                EngineError::Unauthorized("missing or invalid X-User-Id header".to_string())
            })?;

        let role = match parts
            .headers
            .get("x-user-role")
            .and_then(|h| h.to_str().ok())
        {
            Some("buyer") => ActorRole::Buyer,
            Some("seller") => ActorRole::Seller,
            _ => {
                return Err(EngineError::Unauthorized(
                    "missing or invalid X-User-Role header".to_string(),
                ))
            }
        };

        Ok(Principal { user_id, role })
    }
}
