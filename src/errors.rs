use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error classification reported in a Prometheus-style error envelope.
///
/// The set is closed: an envelope carrying an `errorType` outside of it
/// fails to decode and is surfaced as a `bad_response` error instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// The request was well-formed HTTP but the service rejected its content
    BadData,
    /// The service timed out evaluating the request
    Timeout,
    /// The service canceled evaluation of the request
    Canceled,
    /// The service failed while executing the request
    Execution,
    /// The response could not be interpreted (non-success status, malformed
    /// or inconsistent envelope)
    BadResponse,
}

impl Display for ApiErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ApiErrorKind::BadData => "bad_data",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::Canceled => "canceled",
            ApiErrorKind::Execution => "execution",
            ApiErrorKind::BadResponse => "bad_response",
        };
        f.write_str(kind)
    }
}

/// Errors that can occur when talking to a wrapped service
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// Failed to construct the request (malformed URL, unserializable body)
    #[error("Failed to build request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// The call was canceled through its cancellation token
    #[error("Request canceled")]
    Canceled,

    /// Error reported by a Prometheus-style error envelope, or a
    /// protocol-level problem interpreting the response
    #[error("{kind}: {message}")]
    Api {
        /// Error classification from the envelope
        kind: ApiErrorKind,
        /// Error message from the service
        message: String,
    },

    /// Unexpected status code from a service without an error envelope
    #[error("API error: HTTP {status} - {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text
        message: String,
    },

    /// Failed to decode a response payload
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// A query returned a differently shaped result than the caller asked for
    #[error("Unexpected result type: {0}")]
    UnexpectedResultType(String),
}

impl Error {
    /// Check if the error is retryable
    ///
    /// Returns `true` for:
    /// - Network/connection errors
    /// - Timeout errors (transport-level or service-reported)
    /// - Server errors (5xx status codes)
    ///
    /// This is a classifier only; the client never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(reqwest_middleware::Error::Reqwest(err)) => {
                err.is_connect() || err.is_timeout()
            }
            Self::Status { status, .. } => *status >= 500,
            Self::Api { kind, .. } => *kind == ApiErrorKind::Timeout,
            _ => false,
        }
    }
}
