//! Error type for the Management API client.
//!
//! [`ApiError`] separates HTTP-level failures, errors reported inside the
//! service's JSON envelope, bodies the client cannot interpret, and the
//! underlying network failures from `reqwest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-200 HTTP status.
    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    /// HTTP 200, but the envelope carries an `errors` entry.
    #[error("service error (status_code {status_code}): {errors}")]
    Service { status_code: u16, errors: String },

    /// The body is not the envelope or lacks a field the action needs.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A query string parameter was rejected before sending.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// DNS, connection, TLS or timeout failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = ApiError::Status {
            status: 401,
            message: "Invalid api_key".into(),
        };
        assert_eq!(err.to_string(), "HTTP status 401: Invalid api_key");
    }

    #[test]
    fn service_display() {
        let err = ApiError::Service {
            status_code: 400,
            errors: r#"[{"message":"bad filter"}]"#.into(),
        };
        assert_eq!(
            err.to_string(),
            r#"service error (status_code 400): [{"message":"bad filter"}]"#
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiError>();
    }
}
