//! TouriQuest API Client Core
//!
//! Authenticated HTTP client and retry executor for the TouriQuest REST API.
//!
//! # Features
//!
//! - Bearer credential and correlation id on every request
//! - Single-shot token refresh and replay on 401
//! - Normalized failures ([`FailureInfo`]) for every error path
//! - Caller-chosen exponential backoff with jitter ([`RetryExecutor`])
//! - Pluggable transport and credential store
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use touriquest_integration::{
//!     AuthenticatedHttpClient, ClientConfig, Credentials, FileCredentialStore,
//!     RetryExecutor, RetryPolicy,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("https://api.touriquest.example/api/v1")
//!         .build()?;
//!
//!     let client = AuthenticatedHttpClient::builder()
//!         .config(config)
//!         .credential_store(Arc::new(FileCredentialStore::new("credentials.json")))
//!         .reauth_handler(Arc::new(|login: &str| println!("please sign in at {}", login)))
//!         .build()?;
//!
//!     client
//!         .login(Credentials::new("access", Some("refresh".to_string())))
//!         .await?;
//!
//!     let tours: serde_json::Value = client.get("/tours").await?;
//!     println!("{}", tours);
//!
//!     let retry = RetryExecutor::new(RetryPolicy::default());
//!     let request = client.request(touriquest_integration::HttpMethod::Get, "/bookings")?;
//!     let response = client.send_with_retry(request, &retry).await?;
//!     println!("{}", response.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: credentials, refresh payloads and the response envelope
//! - `error`: [`FailureInfo`] and the per-layer error enums
//! - `core`: HTTP transport and the interceptor pipeline
//! - `auth`: credential storage, token refresh and the auth interceptors
//! - `resilience`: retry with exponential backoff
//! - `config`: client configuration
//! - `observability`: logging setup
//! - `client`: [`AuthenticatedHttpClient`] tying it together

pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod observability;
pub mod resilience;
pub mod types;

// Re-export main client
pub use client::{create_client_from_env, AuthenticatedHttpClient, AuthenticatedHttpClientBuilder};

// Re-export configuration
pub use config::{ClientConfig, ClientConfigBuilder};

// Re-export error types
pub use error::{
    ClientResult, ConfigurationError, FailureInfo, StorageError, TransportError, INVALID_REQUEST,
    NETWORK_ERROR, PARSE_ERROR, REAUTH_REQUIRED, TIMEOUT,
};

// Re-export core types
pub use core::{
    CorrelationIdGenerator, HttpMethod, HttpRequest, HttpResponse, HttpTransport,
    MockHttpTransport, ReqwestHttpTransport,
};

// Re-export auth types
pub use auth::{
    CredentialStore, FileCredentialStore, HttpTokenRefresher, InMemoryCredentialStore,
    MockCredentialStore, NoopReauthHandler, ReauthHandler, TokenRefresher,
};

// Re-export resilience types
pub use resilience::{RetryExecutor, RetryPolicy, RetryPolicyBuilder};

// Re-export types
pub use types::{ApiEnvelope, Credentials};

// Re-export observability
pub use observability::{init_logging, LogFormat, LogLevel, LoggingConfig};
