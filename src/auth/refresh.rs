//! Token Refresh
//!
//! Exchanges a refresh token for a new access token at the fixed refresh
//! endpoint.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{FailureInfo, PARSE_ERROR};
use crate::types::{RefreshRequest, RefreshResponse};

/// Token refresher interface.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange `refresh_token` for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, FailureInfo>;
}

/// Refresher calling `POST <refresh_url>` with `{"refreshToken": ..}`.
///
/// Sends straight through the transport so the refresh call never passes the
/// auth interceptors.
pub struct HttpTokenRefresher {
    transport: Arc<dyn HttpTransport>,
    refresh_url: String,
}

impl HttpTokenRefresher {
    pub fn new(transport: Arc<dyn HttpTransport>, refresh_url: impl Into<String>) -> Self {
        Self {
            transport,
            refresh_url: refresh_url.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, FailureInfo> {
        let body = serde_json::to_string(&RefreshRequest { refresh_token }).map_err(|e| {
            FailureInfo::new(format!("Failed to encode refresh request: {}", e), 0)
        })?;

        let request = HttpRequest::new(HttpMethod::Post, self.refresh_url.clone())
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json")
            .with_body(body);

        debug!(url = %self.refresh_url, "Requesting token refresh");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(FailureInfo::from)?;

        if !response.is_success() {
            return Err(FailureInfo::from_response(response.status, &response.body));
        }

        serde_json::from_str(&response.body).map_err(|e| {
            FailureInfo::new(format!("Invalid refresh response: {}", e), response.status)
                .with_code(PARSE_ERROR)
        })
    }
}
