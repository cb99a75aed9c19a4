use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

/// Failure talking to an upstream data provider (Open-Meteo, NOAA).
///
/// Whether a failure is worth retrying is decided by the caller's
/// [`RetryPolicy`](crate::services::retry::RetryPolicy), not here: a
/// `Status` error is only transient if its code is in the policy's set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    /// Connection failure or local timeout.
    #[error("{service} request failed: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    /// Upstream answered with a non-success HTTP status.
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// Upstream answered, but the body was not what we expected.
    #[error("{service} response malformed: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    /// Map a `reqwest` transport error into the taxonomy.
    ///
    /// Status errors from `error_for_status` keep their code; anything else
    /// that happened before a response arrived is a network failure.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return UpstreamError::Status {
                service,
                status: status.as_u16(),
            };
        }
        if err.is_decode() {
            return UpstreamError::Malformed {
                service,
                message: err.to_string(),
            };
        }
        UpstreamError::Network {
            service,
            message: err.to_string(),
        }
    }

    /// Whether a retry loop may try again after this error.
    pub fn is_retryable(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            UpstreamError::Network { .. } => true,
            UpstreamError::Status { status, .. } => retryable_statuses.contains(status),
            UpstreamError::Malformed { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retryable() {
        let err = UpstreamError::Network {
            service: "NOAA",
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable(&[]));
    }

    #[test]
    fn test_status_retryable_only_when_listed() {
        let gateway = UpstreamError::Status {
            service: "NOAA",
            status: 503,
        };
        let bad_request = UpstreamError::Status {
            service: "NOAA",
            status: 400,
        };
        assert!(gateway.is_retryable(&[502, 503, 504]));
        assert!(!bad_request.is_retryable(&[502, 503, 504]));
    }

    #[test]
    fn test_malformed_is_never_retryable() {
        let err = UpstreamError::Malformed {
            service: "NOAA",
            message: "expected value".to_string(),
        };
        assert!(!err.is_retryable(&[502, 503, 504]));
    }

    #[test]
    fn test_external_service_error_maps_to_bad_gateway() {
        let resp = AppError::ExternalServiceError("down".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        let resp = AppError::BadRequest("lat/lon required".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
