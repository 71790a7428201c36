//! HTTP Transport
//!
//! Request envelope, response type and the transport seam used by the client.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::TransportError;

/// Default overall timeout applied to every network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Outbound request envelope.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute request URL.
    pub url: String,
    /// Request headers. Names are stored lowercase.
    pub headers: HashMap<String, String>,
    /// JSON request body.
    pub body: Option<String>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
    /// Set once the request has been replayed after a credential refresh.
    pub retried: bool,
}

impl HttpRequest {
    /// Create a request with no headers or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
            retried: false,
        }
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Build a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Build a JSON response.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let mut response = Self::new(status, body.to_string());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
///
/// Non-2xx statuses are returned as responses; only failures that prevent a
/// response from being received are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestHttpTransport {
    /// Create transport with a custom overall timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else if e.is_builder() {
                TransportError::InvalidRequest {
                    message: e.to_string(),
                }
            } else {
                TransportError::Connection {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else {
                TransportError::Body {
                    message: e.to_string(),
                }
            }
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock HTTP transport for testing.
///
/// Responses are served in the order they were queued.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: serde_json::Value) -> &Self {
        self.queue_response(HttpResponse::json(status, &body))
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: TransportError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self.default_response.lock() = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.request_history.lock().clone()
    }

    /// Get requests sent to URLs ending with `suffix`.
    pub fn get_requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
        self.request_history
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.request_history.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.request_history.lock().push(request);

        let queued = self.responses.lock().pop_front();
        match queued {
            Some(result) => result,
            None => self.default_response.lock().clone().ok_or_else(|| {
                TransportError::Connection {
                    message: "No mock response available".to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_serves_in_order() {
        let transport = MockHttpTransport::new();
        transport
            .queue_json_response(401, serde_json::json!({"message": "expired"}))
            .queue_json_response(200, serde_json::json!({"key": "value"}));

        let request = HttpRequest::new(HttpMethod::Get, "https://example.com/tours");

        let first = transport.send(request.clone()).await.unwrap();
        assert_eq!(first.status, 401);
        let second = transport.send(request).await.unwrap();
        assert_eq!(second.status, 200);
        assert!(second.body.contains("value"));

        let history = transport.get_requests();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].url, "https://example.com/tours");
    }

    #[tokio::test]
    async fn test_mock_transport_empty_queue_is_connection_error() {
        let transport = MockHttpTransport::new();
        let result = transport
            .send(HttpRequest::new(HttpMethod::Get, "https://example.com"))
            .await;
        assert!(matches!(result, Err(TransportError::Connection { .. })));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut request = HttpRequest::new(HttpMethod::Post, "https://example.com")
            .with_header("Authorization", "Bearer abc");
        assert_eq!(request.header("authorization"), Some("Bearer abc"));
        assert_eq!(request.remove_header("AUTHORIZATION"), Some("Bearer abc".to_string()));
        assert!(request.header("authorization").is_none());
        assert!(!request.retried);
    }

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Patch.as_str(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
