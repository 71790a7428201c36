//! TouriQuest API Client
//!
//! Authenticated HTTP client composing the interceptor pipeline: JSON
//! content negotiation, correlation id, bearer credential, and single-shot
//! refresh-and-replay on 401. Every failure a caller sees is a
//! [`FailureInfo`].

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{
    AuthRefreshInterceptor, BearerTokenInterceptor, CredentialStore, HttpTokenRefresher,
    InMemoryCredentialStore, NoopReauthHandler, ReauthHandler, TokenRefresher,
};
use crate::config::ClientConfig;
use crate::core::{
    CorrelationIdGenerator, CorrelationIdInterceptor, Dispatcher, HttpMethod, HttpRequest,
    HttpResponse, HttpTransport, JsonContentTypeInterceptor, Pipeline, RequestInterceptor,
    ReqwestHttpTransport, ResponseInterceptor, TimestampIdGenerator,
};
use crate::error::{
    ClientResult, ConfigurationError, FailureInfo, INVALID_REQUEST, PARSE_ERROR, REAUTH_REQUIRED,
};
use crate::resilience::RetryExecutor;
use crate::types::Credentials;

/// Sets a fixed `User-Agent` header.
struct UserAgentInterceptor(String);

#[async_trait]
impl RequestInterceptor for UserAgentInterceptor {
    async fn intercept(&self, mut request: HttpRequest) -> HttpRequest {
        request.set_header("user-agent", self.0.clone());
        request
    }
}

/// HTTP client with bearer attachment and token refresh.
pub struct AuthenticatedHttpClient {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    pipeline: Pipeline,
}

impl AuthenticatedHttpClient {
    /// Create a client over an explicit transport and credential store.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ConfigurationError> {
        Self::builder()
            .config(config)
            .transport(transport)
            .credential_store(store)
            .build()
    }

    /// Creates a new client builder
    pub fn builder() -> AuthenticatedHttpClientBuilder {
        AuthenticatedHttpClientBuilder::default()
    }

    /// Get the configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the credential store
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.store.clone()
    }

    /// Build a request for `path`, resolved against the base URL.
    pub fn request(&self, method: HttpMethod, path: &str) -> ClientResult<HttpRequest> {
        let url = self.config.resolve(path)?;
        Ok(HttpRequest::new(method, url.as_str()))
    }

    /// Send a request through the full pipeline.
    ///
    /// 2xx responses are returned as-is; any other status and every
    /// transport failure is normalized.
    pub async fn send(&self, request: HttpRequest) -> ClientResult<HttpResponse> {
        let exchange = self.pipeline.dispatch(request).await;

        match exchange.outcome {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => {
                let mut failure = FailureInfo::from_response(response.status, &response.body);
                if exchange.reauth_required {
                    failure = failure.with_code(REAUTH_REQUIRED);
                }
                debug!(
                    status = failure.status_code,
                    code = ?failure.code,
                    url = %exchange.request.url,
                    "Request failed: {}",
                    failure.message
                );
                Err(failure)
            }
            Err(error) => {
                debug!(error = %error, url = %exchange.request.url, "Transport failure");
                Err(FailureInfo::from_transport(&error))
            }
        }
    }

    /// Send a request, retrying transient failures under `retry`.
    ///
    /// Each attempt is a fresh pass through the pipeline, so a 401 inside an
    /// attempt still gets its own single refresh.
    pub async fn send_with_retry(
        &self,
        request: HttpRequest,
        retry: &RetryExecutor,
    ) -> ClientResult<HttpResponse> {
        retry.execute(|| self.send(request.clone())).await
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(HttpMethod::Get, path)?;
        self.send_json(request).await
    }

    /// POST `body` as JSON to `path` and decode the JSON body.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request_with_body(HttpMethod::Post, path, body)?;
        self.send_json(request).await
    }

    /// PUT `body` as JSON to `path` and decode the JSON body.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request_with_body(HttpMethod::Put, path, body)?;
        self.send_json(request).await
    }

    /// PATCH `body` as JSON to `path` and decode the JSON body.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request_with_body(HttpMethod::Patch, path, body)?;
        self.send_json(request).await
    }

    /// DELETE `path` and decode the JSON body.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.request(HttpMethod::Delete, path)?;
        self.send_json(request).await
    }

    /// Store credentials obtained from a login.
    pub async fn login(&self, credentials: Credentials) -> ClientResult<()> {
        self.store.write(credentials).await?;
        Ok(())
    }

    /// Drop the stored credentials.
    pub async fn logout(&self) -> ClientResult<()> {
        self.store.clear().await?;
        Ok(())
    }

    /// Whether an access token is currently stored.
    pub async fn is_authenticated(&self) -> bool {
        matches!(self.store.read().await, Ok(Some(_)))
    }

    fn request_with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> ClientResult<HttpRequest> {
        let body = serde_json::to_string(body).map_err(|e| {
            FailureInfo::new(format!("Failed to encode request body: {}", e), 0)
                .with_code(INVALID_REQUEST)
        })?;
        Ok(self.request(method, path)?.with_body(body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> ClientResult<T> {
        let response = self.send(request).await?;

        // 204 and other empty bodies decode as JSON null.
        let body = if response.body.trim().is_empty() {
            "null"
        } else {
            response.body.as_str()
        };

        serde_json::from_str(body).map_err(|e| {
            FailureInfo::new(format!("Failed to parse response: {}", e), response.status)
                .with_code(PARSE_ERROR)
        })
    }
}

/// Builder for [`AuthenticatedHttpClient`].
#[derive(Default)]
pub struct AuthenticatedHttpClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    store: Option<Arc<dyn CredentialStore>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    reauth: Option<Arc<dyn ReauthHandler>>,
    correlation_ids: Option<Arc<dyn CorrelationIdGenerator>>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl AuthenticatedHttpClientBuilder {
    /// Sets the configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the transport. Defaults to reqwest with the configured timeout.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the credential store. Defaults to an in-memory store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the token refresher. Defaults to the configured refresh endpoint.
    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Sets the handler told to send the user back to sign in.
    pub fn reauth_handler(mut self, handler: Arc<dyn ReauthHandler>) -> Self {
        self.reauth = Some(handler);
        self
    }

    /// Sets the correlation id generator
    pub fn correlation_ids(mut self, generator: Arc<dyn CorrelationIdGenerator>) -> Self {
        self.correlation_ids = Some(generator);
        self
    }

    /// Adds a request interceptor, run after the built-in header interceptors
    /// and before the bearer credential is attached.
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Adds a response interceptor, run after refresh-and-replay.
    pub fn response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    /// Builds the client
    pub fn build(self) -> Result<AuthenticatedHttpClient, ConfigurationError> {
        let config = self.config.ok_or_else(|| ConfigurationError::MissingRequired {
            field: "config".to_string(),
        })?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestHttpTransport::with_timeout(config.timeout).map_err(|e| {
                ConfigurationError::InvalidConfig {
                    message: e.to_string(),
                }
            })?) as Arc<dyn HttpTransport>,
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCredentialStore::new()));

        let refresher = match self.refresher {
            Some(refresher) => refresher,
            None => Arc::new(HttpTokenRefresher::new(
                transport.clone(),
                config.refresh_url()?.as_str(),
            )) as Arc<dyn TokenRefresher>,
        };

        let reauth = self.reauth.unwrap_or_else(|| Arc::new(NoopReauthHandler));
        let correlation_ids = self
            .correlation_ids
            .unwrap_or_else(|| Arc::new(TimestampIdGenerator));

        let mut pipeline = Pipeline::new(transport)
            .with_request_interceptor(Arc::new(JsonContentTypeInterceptor))
            .with_request_interceptor(Arc::new(CorrelationIdInterceptor::new(
                config.correlation_header.clone(),
                correlation_ids,
            )));

        if let Some(user_agent) = &config.user_agent {
            pipeline =
                pipeline.with_request_interceptor(Arc::new(UserAgentInterceptor(user_agent.clone())));
        }
        for interceptor in self.request_interceptors {
            pipeline = pipeline.with_request_interceptor(interceptor);
        }

        pipeline = pipeline
            .with_request_interceptor(Arc::new(BearerTokenInterceptor::new(store.clone())))
            .with_response_interceptor(Arc::new(AuthRefreshInterceptor::new(
                store.clone(),
                refresher,
                reauth,
                config.login_path.clone(),
            )));

        for interceptor in self.response_interceptors {
            pipeline = pipeline.with_response_interceptor(interceptor);
        }

        Ok(AuthenticatedHttpClient {
            config,
            store,
            pipeline,
        })
    }
}

/// Create a client from environment variables with the default transport
/// and an in-memory credential store.
pub fn create_client_from_env() -> Result<AuthenticatedHttpClient, ConfigurationError> {
    AuthenticatedHttpClient::builder()
        .config(ClientConfig::from_env()?)
        .build()
}
