//! HTTP transport seam.
//!
//! The client never talks to `reqwest` directly; it goes through
//! [`HttpTransport`] so the dispatcher can be driven by any request/response
//! primitive. [`ReqwestTransport`] is the production implementation.

pub mod reqwest_transport;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use thiserror::Error;

pub use reqwest_transport::ReqwestTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Look up a request header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    /// Header names are stored lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a response header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k == &lower)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport gave up waiting on its own deadline.
    #[error("request timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            status_text: "OK".into(),
            headers: vec![("machine-id".into(), "m-42".into())],
            body: Vec::new(),
        };
        assert_eq!(response.header("Machine-Id"), Some("m-42"));
        assert_eq!(response.header("x-missing"), None);
        assert!(response.is_success());
    }

    #[test]
    fn non_2xx_is_not_success() {
        for status in [199, 301, 404, 500] {
            let response = HttpResponse {
                status,
                status_text: String::new(),
                headers: Vec::new(),
                body: Vec::new(),
            };
            assert!(!response.is_success(), "status {} should fail", status);
        }
    }
}
