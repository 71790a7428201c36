//! Configuration types for the TouriQuest API client.

use std::time::Duration;
use url::Url;

use crate::core::{DEFAULT_CORRELATION_HEADER, DEFAULT_TIMEOUT};
use crate::error::ConfigurationError;

/// Default path of the token refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
/// Default re-authentication entry point.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is joined to
    pub base_url: Url,
    /// Overall timeout for each network call
    pub timeout: Duration,
    /// Path of the token refresh endpoint, relative to the base URL
    pub refresh_path: String,
    /// Re-authentication entry point handed to the reauth handler
    pub login_path: String,
    /// Header carrying the correlation identifier
    pub correlation_header: String,
    /// Optional User-Agent header
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Creates a new configuration builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Creates a configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let base_url =
            std::env::var("TOURIQUEST_API_URL").map_err(|_| ConfigurationError::MissingRequired {
                field: "TOURIQUEST_API_URL".to_string(),
            })?;

        let mut builder = Self::builder().base_url(base_url);

        if let Some(secs) = std::env::var("TOURIQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Ok(path) = std::env::var("TOURIQUEST_REFRESH_PATH") {
            builder = builder.refresh_path(path);
        }
        if let Ok(path) = std::env::var("TOURIQUEST_LOGIN_PATH") {
            builder = builder.login_path(path);
        }

        builder.build()
    }

    /// Resolve an API path against the base URL.
    ///
    /// Paths are appended to the base URL's path, so a base of
    /// `https://host/api/v1` and a path of `/tours` yield
    /// `https://host/api/v1/tours`. Absolute URLs are returned unchanged.
    pub fn resolve(&self, path: &str) -> Result<Url, ConfigurationError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|_| ConfigurationError::InvalidEndpoint {
                url: path.to_string(),
            });
        }

        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        base.join(path.trim_start_matches('/'))
            .map_err(|_| ConfigurationError::InvalidEndpoint {
                url: format!("{}{}", self.base_url, path),
            })
    }

    /// Absolute URL of the refresh endpoint.
    pub fn refresh_url(&self) -> Result<Url, ConfigurationError> {
        self.resolve(&self.refresh_path)
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    refresh_path: Option<String>,
    login_path: Option<String>,
    correlation_header: Option<String>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    /// Sets the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the refresh endpoint path
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Sets the re-authentication entry point
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the correlation header name
    pub fn correlation_header(mut self, header: impl Into<String>) -> Self {
        self.correlation_header = Some(header.into());
        self
    }

    /// Sets the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the configuration
    pub fn build(self) -> Result<ClientConfig, ConfigurationError> {
        let raw = self
            .base_url
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "base_url".to_string(),
            })?;

        let base_url =
            Url::parse(&raw).map_err(|_| ConfigurationError::InvalidEndpoint { url: raw.clone() })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigurationError::InvalidEndpoint { url: raw });
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(ClientConfig {
            base_url,
            timeout,
            refresh_path: self
                .refresh_path
                .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string()),
            login_path: self
                .login_path
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            correlation_header: self
                .correlation_header
                .unwrap_or_else(|| DEFAULT_CORRELATION_HEADER.to_string()),
            user_agent: self.user_agent,
        })
    }
}
