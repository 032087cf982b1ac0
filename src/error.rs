// Error handling module
// Client error kinds and their HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ServiceError;

/// Maximum characters of a raw response body carried in an error
pub const ERROR_SNIPPET_LEN: usize = 200;

/// Maximum characters of a raw login response carried when the token is missing
pub const MISSING_TOKEN_SNIPPET_LEN: usize = 300;

/// Login exchange failures
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login endpoint answered with a non-200 status
    #[error("login rejected [status: {status}] | response: {body}")]
    Status { status: u16, body: String },

    /// Login endpoint answered with something that is not JSON
    #[error("login response is not JSON | response: {body}")]
    NotJson { body: String },

    /// JSON response without a usable `data.token`
    #[error("login response contains no token | response: {body}")]
    MissingToken { body: String },
}

/// Failures of an authenticated API request
#[derive(Error, Debug)]
pub enum RequestError {
    /// Non-200 status (after the single 401 retry, if one happened)
    #[error("request failed [status: {status}] | response: {body}")]
    Status { status: u16, body: String },

    /// Body could not be parsed as JSON
    #[error("response is not JSON [status: {status}] | response: {body}")]
    InvalidJson { status: u16, body: String },
}

/// Errors raised by the OpenList client
#[derive(Error, Debug)]
pub enum OpenListError {
    /// Missing or empty argument, or unsupported task type; raised before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("Request failed: {0}")]
    Request(#[from] RequestError),

    /// Network or timeout failure from the HTTP stack
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl OpenListError {
    pub fn validation(message: impl Into<String>) -> Self {
        OpenListError::Validation(message.into())
    }

    /// Upstream HTTP status, if the error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenListError::Authentication(AuthError::Status { status, .. }) => Some(*status),
            OpenListError::Request(RequestError::Status { status, .. })
            | OpenListError::Request(RequestError::InvalidJson { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, OpenListError>;

/// Cut a string to at most `max` characters without splitting a code point
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Errors returned by the monitor's own HTTP surface
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or wrong API key
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Unknown sensor or service
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// OpenList server rejected or failed the call
    #[error("OpenList error: {message}")]
    Upstream { status: Option<u16>, message: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownService(name) => {
                ApiError::NotFound(format!("unknown service: {}", name))
            }
            ServiceError::MissingArgument { .. } | ServiceError::UnsupportedTaskType { .. } => {
                ApiError::ValidationError(err.to_string())
            }
            ServiceError::Failed {
                source: OpenListError::Validation(_),
                ..
            } => ApiError::ValidationError(err.to_string()),
            ServiceError::Failed { ref source, .. } => ApiError::Upstream {
                status: source.status(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "auth_error", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Upstream { message, .. } => {
                (StatusCode::BAD_GATEWAY, "openlist_error", message)
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}
