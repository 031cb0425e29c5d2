//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use verimark_core::VerimarkError;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upload exceeds the configured file size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Request timeout - operation took too long
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the watermark, steganography or proof contracts
    #[error("Verimark error: {0}")]
    Core(#[from] VerimarkError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::PayloadTooLarge(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(ref e) => match e {
                // Client-provided invalid input → 400
                VerimarkError::InputError(_) | VerimarkError::InvalidOptions(_) => {
                    StatusCode::BAD_REQUEST
                }
                VerimarkError::PasswordError(_) => StatusCode::UNAUTHORIZED,
                VerimarkError::CapacityExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                VerimarkError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,

                // Data that decodes but does not verify → 422
                VerimarkError::IntegrityError(_) | VerimarkError::ImageError(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }

                // Ledger failures → 503 when retrying may help, 502 otherwise
                VerimarkError::LedgerError {
                    transient: true, ..
                } => StatusCode::SERVICE_UNAVAILABLE,
                VerimarkError::LedgerError { .. } => StatusCode::BAD_GATEWAY,

                VerimarkError::Cancelled => StatusCode::REQUEST_TIMEOUT,

                // Internal processing failures → 500
                VerimarkError::CryptoError(_) | VerimarkError::SerializationError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PayloadTooLarge(_) => "FILE_TOO_LARGE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Core(ref e) => match e {
                VerimarkError::InputError(_) => "INVALID_INPUT",
                VerimarkError::InvalidOptions(_) => "INVALID_OPTIONS",
                VerimarkError::PasswordError(_) => "PASSWORD_ERROR",
                VerimarkError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
                VerimarkError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
                VerimarkError::IntegrityError(_) => "INTEGRITY_ERROR",
                VerimarkError::ImageError(_) => "IMAGE_ERROR",
                VerimarkError::LedgerError {
                    transient: true, ..
                } => "LEDGER_UNAVAILABLE",
                VerimarkError::LedgerError { .. } => "LEDGER_REJECTED",
                VerimarkError::Cancelled => "CANCELLED",
                VerimarkError::CryptoError(_) => "CRYPTO_ERROR",
                VerimarkError::SerializationError(_) => "SERIALIZATION_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            Self::Core(ref e) => match e {
                // These messages are meant for the end user as-is
                VerimarkError::InputError(m)
                | VerimarkError::InvalidOptions(m)
                | VerimarkError::PasswordError(m)
                | VerimarkError::UnsupportedType(m)
                | VerimarkError::IntegrityError(m) => m.clone(),
                VerimarkError::CapacityExceeded { .. } => e.to_string(),
                VerimarkError::ImageError(_) => "Could not decode image".to_string(),
                VerimarkError::LedgerError { .. } => "Ledger unavailable".to_string(),
                VerimarkError::Cancelled => "Operation cancelled".to_string(),
                VerimarkError::CryptoError(_) => "Cryptographic operation failed".to_string(),
                VerimarkError::SerializationError(_) => "Serialization error".to_string(),
            },
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
            Self::Core(_) => "core",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_status_mapping() {
        let cases = [
            (VerimarkError::InputError("x".into()), StatusCode::BAD_REQUEST),
            (VerimarkError::PasswordError("x".into()), StatusCode::UNAUTHORIZED),
            (
                VerimarkError::UnsupportedType("x".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                VerimarkError::IntegrityError("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                VerimarkError::CapacityExceeded {
                    needed: 10,
                    available: 5,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                VerimarkError::ledger_transient("timeout"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_user_facing_messages_pass_through() {
        let err = ApiError::from(VerimarkError::PasswordError(
            "Invalid password for steganography extraction".into(),
        ));
        assert_eq!(
            err.client_message(),
            "Invalid password for steganography extraction"
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError::from(VerimarkError::CryptoError("aead tag mismatch".into()));
        assert!(!err.client_message().contains("aead"));
        assert_eq!(err.error_code(), "CRYPTO_ERROR");
    }
}
