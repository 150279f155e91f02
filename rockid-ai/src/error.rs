//! Error types for rockid-ai
//!
//! Every error body carries an `error` string plus a payload the caller can
//! render without branching on status: fallback record fields for identify,
//! a `response` text for chat.

use crate::chat::CHAT_APOLOGY;
use crate::fusion::fallback_record;
use crate::types::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rockid_common::api::{ChatResponse, ErrorResponse};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Identify request without a usable image (400)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Identify body over the configured limit (413)
    #[error("Image too large: {0}")]
    ImageTooLarge(String),

    /// Chat request without a usable message (400)
    #[error("Invalid chat request: {0}")]
    InvalidChat(String),

    /// Chat body over the configured limit (413)
    #[error("Chat request too large: {0}")]
    ChatTooLarge(String),

    /// No chat provider configured (503)
    #[error("Chat is not available: no provider configured")]
    ChatUnavailable,

    /// Chat provider failed (500); only the failure kind is exposed
    #[error("Chat failed: {}", .0.kind())]
    ChatFailed(#[from] ProviderError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.to_string();
        match self {
            ApiError::InvalidImage(_) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(error, fallback_record())),
            )
                .into_response(),
            ApiError::ImageTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new(error, fallback_record())),
            )
                .into_response(),
            ApiError::InvalidChat(_) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    error,
                    ChatResponse {
                        response: "Please type a question about your rock.".to_string(),
                    },
                )),
            )
                .into_response(),
            ApiError::ChatTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ErrorResponse::new(
                    error,
                    ChatResponse {
                        response: "That message is too large. Please ask a shorter question."
                            .to_string(),
                    },
                )),
            )
                .into_response(),
            ApiError::ChatUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    error,
                    ChatResponse {
                        response: CHAT_APOLOGY.to_string(),
                    },
                )),
            )
                .into_response(),
            ApiError::ChatFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    error,
                    ChatResponse {
                        response: CHAT_APOLOGY.to_string(),
                    },
                )),
            )
                .into_response(),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
