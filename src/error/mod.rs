//! Centralized error handling for the guarantee-slot engine
//!
//! This module provides a unified error type for the engine with stable
//! error codes, HTTP status code mapping and JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Engine error type with stable code and HTTP status mapping
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid campaign: {0}")]
    InvalidCampaign(String),

    #[error("Request is not negotiable: {0}")]
    NotNegotiable(String),

    #[error("Request is not fundable: {0}")]
    RequestNotFundable(String),

    #[error("Insufficient paid balance: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Slot is not active: {0}")]
    SlotNotActive(String),

    #[error("Rank achievement already confirmed for this slot today")]
    AlreadyConfirmedToday,

    #[error("Nothing to refund")]
    NothingToRefund,

    #[error("Refund request is not pending")]
    RequestNotPending,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Concurrent modification, retry with fresh state")]
    ConcurrentModification,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl EngineError {
    /// Get the stable error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::InvalidCampaign(_) => "INVALID_CAMPAIGN",
            EngineError::NotNegotiable(_) => "NOT_NEGOTIABLE",
            EngineError::RequestNotFundable(_) => "REQUEST_NOT_FUNDABLE",
            EngineError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            EngineError::SlotNotActive(_) => "SLOT_NOT_ACTIVE",
            EngineError::AlreadyConfirmedToday => "ALREADY_CONFIRMED_TODAY",
            EngineError::NothingToRefund => "NOTHING_TO_REFUND",
            EngineError::RequestNotPending => "REQUEST_NOT_PENDING",
            EngineError::Unauthorized(_) => "UNAUTHORIZED",
            EngineError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::Database(_) => "DATABASE_ERROR",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::InvalidCampaign(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::NotNegotiable(_) => StatusCode::CONFLICT,
            EngineError::RequestNotFundable(_) => StatusCode::CONFLICT,
            EngineError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::SlotNotActive(_) => StatusCode::CONFLICT,
            EngineError::AlreadyConfirmedToday => StatusCode::CONFLICT,
            EngineError::NothingToRefund => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::RequestNotPending => StatusCode::CONFLICT,
            EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
            EngineError::ConcurrentModification => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            EngineError::Database(_) | EngineError::Internal(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => EngineError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // The unique index on settlements (slot_id, confirmed_on) is the
                // idempotency arbiter for daily confirmation.
                if db_err.constraint() == Some("uq_settlements_slot_day") {
                    return EngineError::AlreadyConfirmedToday;
                }
                EngineError::Database(err.to_string())
            }
            _ => EngineError::Database(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(err: validator::ValidationErrors) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
