use std::time::Duration;

use thiserror::Error;

use crate::models::JobId;
use crate::transport::{HttpResponse, TransportError};

#[derive(Debug, Error)]
pub enum PixelsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The call itself was malformed and never reached the network.
    #[error("Invalid call: {0}")]
    InvalidCall(String),

    #[error("Request timed out after {}ms", .after.as_millis())]
    TimeoutError { after: Duration },

    /// Connection, DNS or protocol failure below HTTP.
    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Request aborted")]
    Aborted,

    #[error("HTTP {status} {status_text}: {body}")]
    StatusError {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The poll stream for a job closed before the server produced a result.
    #[error("Subscription for job {job_id} ended without a result")]
    SubscriptionEnded { job_id: JobId },

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl PixelsError {
    /// Builds a [`PixelsError::StatusError`] from a non-success response.
    pub fn from_response(response: &HttpResponse) -> Self {
        PixelsError::StatusError {
            status: response.status,
            status_text: response.status_text.clone(),
            body: response.text(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PixelsError::TimeoutError { .. })
    }

    pub(crate) fn from_transport(error: TransportError, after: Option<Duration>) -> Self {
        match error {
            TransportError::Timeout => PixelsError::TimeoutError {
                after: after.unwrap_or_default(),
            },
            TransportError::Failed(msg) => PixelsError::RequestError(msg),
        }
    }
}

impl From<serde_json::Error> for PixelsError {
    fn from(e: serde_json::Error) -> Self {
        PixelsError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PixelsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_keeps_status_text_and_body() {
        let response = HttpResponse {
            status: 500,
            status_text: "Internal Server Error".to_string(),
            headers: Vec::new(),
            body: b"internal error".to_vec(),
        };

        let err = PixelsError::from_response(&response);
        let rendered = err.to_string();
        assert!(rendered.contains("Internal Server Error"));
        assert!(rendered.contains("internal error"));
        assert!(!err.is_timeout());
    }

    #[test]
    fn transport_timeout_maps_to_timeout_kind() {
        let err = PixelsError::from_transport(TransportError::Timeout, Some(Duration::from_secs(30)));
        assert!(err.is_timeout());

        let err = PixelsError::from_transport(TransportError::Failed("dns".into()), None);
        assert!(matches!(err, PixelsError::RequestError(ref msg) if msg == "dns"));
    }
}
