//! Unified application error for services, store and HTTP adapters
//!
//! `AppError` carries an [`ErrorCode`] that maps each business outcome to its
//! HTTP status. Infrastructure failures (sqlx, jwt, hashing) convert via
//! `From` with the detail logged server-side and the client seeing only a
//! generic internal error.

use axum::Json;
use axum::response::IntoResponse;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Error categories exposed at the HTTP boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed input: bad JSON, bad content type, empty credentials
    Validation,
    /// Missing/invalid token or wrong credentials
    Unauthorized,
    /// Withdrawal would drive the balance negative
    InsufficientFunds,
    /// Login already registered
    LoginTaken,
    /// Order number already uploaded by another user
    OrderConflict,
    /// Order number fails the Luhn check
    InvalidOrderNumber,
    /// Storage or other infrastructure failure
    Internal,
}

impl ErrorCode {
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::LoginTaken | ErrorCode::OrderConflict => StatusCode::CONFLICT,
            ErrorCode::InvalidOrderNumber => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(self) -> &'static str {
        match self {
            ErrorCode::Validation => "invalid request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InsufficientFunds => "insufficient points",
            ErrorCode::LoginTaken => "login already taken",
            ErrorCode::OrderConflict => "order uploaded by another user",
            ErrorCode::InvalidOrderNumber => "invalid order number",
            ErrorCode::Internal => "internal server error",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Validation, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized)
    }

    pub fn login_taken() -> Self {
        Self::new(ErrorCode::LoginTaken)
    }

    pub fn order_conflict() -> Self {
        Self::new(ErrorCode::OrderConflict)
    }

    pub fn invalid_order_number() -> Self {
        Self::new(ErrorCode::InvalidOrderNumber)
    }

    pub fn insufficient_funds() -> Self {
        Self::new(ErrorCode::InsufficientFunds)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Internal, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "database error");
        AppError::new(ErrorCode::Internal)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.code.http_status();
        if status.is_server_error() {
            tracing::error!(message = %self.message, "request failed");
        }
        (status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
