//! Error types for the gateway.
//!
//! The taxonomy splits into one fatal class and several degradable classes.
//! [`GatewayError::ConfigurationError`] (unknown provider, missing mandatory
//! endpoint) is surfaced immediately and never retried. Everything else is
//! ordinary upstream trouble: the synchronous path degrades it to readable
//! answer text via [`crate::traits::ChatClient::chat_or_explain`], and the
//! streaming path degrades it to stream-open absence or a failed relay.

use thiserror::Error;

/// All errors produced by the gateway and its provider adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// DNS/TCP/TLS level failure before any HTTP exchange happened.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The upstream rejected our credentials (401/403).
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Non-2xx upstream response with its body.
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// The response arrived but did not have the shape the adapter expects.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The transport died after the stream was established.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// The request did not complete within the per-call deadline.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Any other HTTP client failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Durable storage rejected a transcript write.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Fatal misconfiguration: unknown provider key, missing mandatory endpoint.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl GatewayError {
    /// Fatal errors are surfaced to the caller as-is instead of being
    /// converted into fallback answer text.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }

    /// Classify a transport-level `reqwest` failure.
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout_secs)
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else {
            Self::HttpError(error.to_string())
        }
    }

    /// Classify a non-success HTTP response, consuming its body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Self::AuthError(format!("upstream returned {status}: {body}")),
            code => Self::ApiError {
                code,
                message: body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_fatal() {
        assert!(GatewayError::ConfigurationError("bad".into()).is_fatal());
        assert!(!GatewayError::Timeout(30).is_fatal());
        assert!(
            !GatewayError::ApiError {
                code: 500,
                message: "boom".into()
            }
            .is_fatal()
        );
    }
}
