//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventId, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2301,
///     "message": "guest ... is already registered for event ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see ranges on [`ApiError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                 |
/// |-----------|---------------------|-----------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request             |
/// | 2000–2099 | Not Found           | 404 Not Found               |
/// | 2100–2299 | Auth                | 401 Unauthorized / 403      |
/// | 2300–2399 | Conflict            | 409 Conflict                |
/// | 3000–3999 | Server              | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A path or body identifier is not a valid UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Serial code is unknown or already consumed. Both cases are
    /// reported identically.
    #[error("invalid or already used serial number")]
    SerialUnavailable,

    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The guest has no registration in the event.
    #[error("user {guest_id} is not registered for event {event_id}")]
    GuestNotRegistered {
        /// Event that was searched.
        event_id: EventId,
        /// Guest that was not found.
        guest_id: UserId,
    },

    /// The referenced user does not exist or is not a DJ.
    #[error("DJ not found: {0}")]
    DjNotFound(UserId),

    /// The DJ has no event scheduled for today.
    #[error("no live event found for DJ {0}")]
    NoLiveEvent(UserId),

    /// Missing, malformed or expired credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (e.g. a guest calling a DJ-only route).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The guest already appears in the event's guest list.
    #[error("guest {guest_id} is already registered for event {event_id}")]
    AlreadyRegistered {
        /// Event the guest is registered for.
        event_id: EventId,
        /// The duplicate guest.
        guest_id: UserId,
    },

    /// Another account already uses this e-mail address.
    #[error("user already exists: {0}")]
    EmailTaken(String),

    /// The stored event document changed underneath this write.
    #[error("event {0} was modified concurrently; retry the request")]
    VersionConflict(EventId),

    /// Client exceeded rate limit.
    #[error("rate limit exceeded; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Milliseconds until the client may retry.
        retry_after_ms: u64,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidId(_) => 1002,
            Self::SerialUnavailable => 1101,
            Self::EventNotFound(_) => 2001,
            Self::UserNotFound(_) => 2002,
            Self::GuestNotRegistered { .. } => 2003,
            Self::DjNotFound(_) => 2004,
            Self::NoLiveEvent(_) => 2005,
            Self::Unauthorized(_) => 2101,
            Self::Forbidden(_) => 2201,
            Self::AlreadyRegistered { .. } => 2301,
            Self::EmailTaken(_) => 2302,
            Self::VersionConflict(_) => 2303,
            Self::RateLimited { .. } => 429,
            Self::PersistenceError(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidId(_) | Self::SerialUnavailable => {
                StatusCode::BAD_REQUEST
            }
            Self::EventNotFound(_)
            | Self::UserNotFound(_)
            | Self::GuestNotRegistered { .. }
            | Self::DjNotFound(_)
            | Self::NoLiveEvent(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::AlreadyRegistered { .. } | Self::EmailTaken(_) | Self::VersionConflict(_) => {
                StatusCode::CONFLICT
            }
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Shorthand for the 403 returned by DJ-only routes.
    #[must_use]
    pub fn dj_only() -> Self {
        Self::Forbidden("only DJs can perform this action".to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let retry_after = match &self {
            Self::RateLimited { retry_after_ms } => Some(retry_after_ms.div_ceil(1000).max(1)),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message,
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_variants_map_to_409() {
        let err = ApiError::AlreadyRegistered {
            event_id: EventId::new(),
            guest_id: UserId::new(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 2301);
    }

    #[test]
    fn serial_failures_are_generic_bad_requests() {
        assert_eq!(
            ApiError::SerialUnavailable.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::PersistenceError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_ms: 1500,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("2")
        );
    }
}
