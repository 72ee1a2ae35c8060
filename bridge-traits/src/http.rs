//! Read-only HTTP transport
//!
//! Remote clients (Drive, the geocoder) only issue GET requests and own their
//! retry policy, so the transport contract is a single `execute` call that
//! reports every status as a response.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-case
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Quota and rate-limit responses (403 and 429).
    ///
    /// Google APIs report exhausted per-user quota as 403 rather than 429, so
    /// both are treated as retryable rate limits.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 403 || self.status == 429
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute `request`.
    ///
    /// Non-2xx statuses are returned as responses, not errors. Errors are
    /// reserved for transport failures (DNS, TLS, connection reset, timeout).
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://nominatim.example/reverse")
            .header("Accept-Language", "en")
            .timeout(Duration::from_secs(300));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.headers.get("Accept-Language").map(String::as_str), Some("en"));
        assert_eq!(request.timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_status_classes() {
        assert!(response(204).is_success());
        assert!(!response(404).is_success());
        assert!(!response(404).is_rate_limited());
        assert!(!response(500).is_rate_limited());
        for status in [403, 429] {
            assert!(response(status).is_rate_limited());
        }
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        assert_eq!(response(200).header("Content-Type"), Some("application/json"));
        assert_eq!(response(200).header("retry-after"), None);
    }
}
