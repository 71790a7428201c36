//! Middleware
//!
//! Request and response interceptor chain composed around a transport.
//!
//! Request interceptors run in registration order and may only rewrite the
//! outgoing request. Response interceptors see the request together with its
//! outcome and may replace the outcome, optionally by replaying a prepared
//! request. A replayed exchange continues down the same response chain, so
//! interceptors registered later see it exactly once.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::core::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::TransportError;

/// Header carrying the correlation identifier.
pub const DEFAULT_CORRELATION_HEADER: &str = "X-Request-ID";

/// A request together with what came back for it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: HttpRequest,
    pub outcome: Result<HttpResponse, TransportError>,
    /// Set when the session was dropped and the user must sign in again.
    pub reauth_required: bool,
}

impl Exchange {
    pub fn new(request: HttpRequest, outcome: Result<HttpResponse, TransportError>) -> Self {
        Self {
            request,
            outcome,
            reauth_required: false,
        }
    }

    /// Status of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        self.outcome.as_ref().ok().map(|r| r.status)
    }
}

/// Rewrites outbound requests.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: HttpRequest) -> HttpRequest;
}

/// Inspects and optionally replaces the outcome of an exchange.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn intercept(&self, exchange: Exchange, dispatcher: &dyn Dispatcher) -> Exchange;
}

/// Sends requests through the pipeline.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run request interceptors, the transport and response interceptors.
    async fn dispatch(&self, request: HttpRequest) -> Exchange;

    /// Send an already prepared request straight to the transport.
    ///
    /// No interceptor runs; the request goes out byte-for-byte as given.
    async fn replay(&self, request: HttpRequest) -> Exchange;
}

/// Composed interceptor chain over a transport.
pub struct Pipeline {
    transport: Arc<dyn HttpTransport>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Append a request interceptor.
    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Append a response interceptor.
    pub fn with_response_interceptor(
        mut self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }
}

#[async_trait]
impl Dispatcher for Pipeline {
    async fn dispatch(&self, mut request: HttpRequest) -> Exchange {
        for interceptor in &self.request_interceptors {
            request = interceptor.intercept(request).await;
        }

        let mut exchange = self.replay(request).await;

        for interceptor in &self.response_interceptors {
            exchange = interceptor.intercept(exchange, self).await;
        }

        exchange
    }

    async fn replay(&self, request: HttpRequest) -> Exchange {
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            retried = request.retried,
            "Sending request"
        );

        let outcome = self.transport.send(request.clone()).await;
        Exchange::new(request, outcome)
    }
}

/// Sets the JSON content negotiation headers.
pub struct JsonContentTypeInterceptor;

#[async_trait]
impl RequestInterceptor for JsonContentTypeInterceptor {
    async fn intercept(&self, mut request: HttpRequest) -> HttpRequest {
        if request.header("content-type").is_none() {
            request.set_header("content-type", "application/json");
        }
        if request.header("accept").is_none() {
            request.set_header("accept", "application/json");
        }
        request
    }
}

/// Produces correlation identifiers.
pub trait CorrelationIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Millisecond timestamp identifiers. Uniqueness is best-effort.
pub struct TimestampIdGenerator;

impl CorrelationIdGenerator for TimestampIdGenerator {
    fn next_id(&self) -> String {
        Utc::now().timestamp_millis().to_string()
    }
}

/// Attaches a correlation identifier to every request.
pub struct CorrelationIdInterceptor {
    header: String,
    generator: Arc<dyn CorrelationIdGenerator>,
}

impl CorrelationIdInterceptor {
    pub fn new(header: impl Into<String>, generator: Arc<dyn CorrelationIdGenerator>) -> Self {
        Self {
            header: header.into(),
            generator,
        }
    }
}

impl Default for CorrelationIdInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_HEADER, Arc::new(TimestampIdGenerator))
    }
}

#[async_trait]
impl RequestInterceptor for CorrelationIdInterceptor {
    async fn intercept(&self, mut request: HttpRequest) -> HttpRequest {
        request.set_header(&self.header, self.generator.next_id());
        request
    }
}
