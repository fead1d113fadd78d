//! Error types for the Dawn Eats API client.
//!
//! # Design
//! Non-2xx responses are split by status family so callers can tell an
//! expired session (`Unauthorized`) from bad input (`Validation`) or a
//! missing resource (`NotFound`). For every status-carrying variant the
//! `Display` output is exactly the server's message, falling back to
//! [`FALLBACK_MESSAGE`] when the body has no usable `detail`.

use thiserror::Error;

/// Message used when an error response carries no `detail`.
pub const FALLBACK_MESSAGE: &str = "API request failed";

/// Errors returned by `DawnClient` parse methods and the `Dispatcher`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 or 403: missing, expired or rejected session token.
    #[error("{message}")]
    Unauthorized { status: u16, message: String },

    /// 404: the requested resource does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// 400 or 422: the server rejected the request payload.
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// A 2xx body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Classify a non-2xx status and its extracted message.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            404 => ApiError::NotFound { message },
            400 | 422 => ApiError::Validation { status, message },
            _ => ApiError::Http { status, message },
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Http { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Network(_) | ApiError::Decode(_) | ApiError::Serialization(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}
