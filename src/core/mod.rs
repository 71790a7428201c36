//! Core Infrastructure
//!
//! HTTP transport and the interceptor pipeline built on top of it.

pub mod middleware;
pub mod transport;

pub use middleware::{
    CorrelationIdGenerator, CorrelationIdInterceptor, Dispatcher, Exchange,
    JsonContentTypeInterceptor, Pipeline, RequestInterceptor, ResponseInterceptor,
    TimestampIdGenerator, DEFAULT_CORRELATION_HEADER,
};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport, DEFAULT_TIMEOUT,
};
