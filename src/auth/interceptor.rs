//! Auth Interceptors
//!
//! Bearer attachment on the way out, single-shot refresh-and-replay on the
//! way back.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::refresh::TokenRefresher;
use crate::auth::store::CredentialStore;
use crate::core::{Dispatcher, Exchange, HttpRequest, RequestInterceptor, ResponseInterceptor};
use crate::types::Credentials;

const AUTHORIZATION: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// Attaches `Authorization: Bearer <access token>` when one is stored.
pub struct BearerTokenInterceptor {
    store: Arc<dyn CredentialStore>,
}

impl BearerTokenInterceptor {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RequestInterceptor for BearerTokenInterceptor {
    async fn intercept(&self, mut request: HttpRequest) -> HttpRequest {
        match self.store.read().await {
            Ok(Some(credentials)) => {
                request.set_header(
                    AUTHORIZATION,
                    format!("{}{}", BEARER_PREFIX, credentials.access_token()),
                );
            }
            Ok(None) => {
                request.remove_header(AUTHORIZATION);
            }
            Err(e) => {
                // Send unauthenticated rather than suppress the call.
                warn!(error = %e, "Failed to read credentials");
                request.remove_header(AUTHORIZATION);
            }
        }
        request
    }
}

/// Signals that the user must sign in again.
#[cfg_attr(test, mockall::automock)]
pub trait ReauthHandler: Send + Sync {
    /// Navigate to the re-authentication entry point.
    fn reauthenticate(&self, login_path: &str);
}

/// Handler that only logs.
pub struct NoopReauthHandler;

impl ReauthHandler for NoopReauthHandler {
    fn reauthenticate(&self, login_path: &str) {
        debug!(login_path, "Re-authentication required");
    }
}

impl<F> ReauthHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn reauthenticate(&self, login_path: &str) {
        self(login_path)
    }
}

/// Lifecycle of one request through the refresh path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Never replayed.
    Fresh,
    /// Refresh in progress, replay pending.
    Refreshing,
    /// Replayed once with a new credential; outcome is final.
    Replayed,
    /// No replay; the outcome is final.
    Failed,
}

impl RefreshState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Refreshing => "refreshing",
            Self::Replayed => "replayed",
            Self::Failed => "failed",
        }
    }
}

enum RefreshOutcome {
    Token(String),
    Reauth,
    /// The store could not be read; leave the session and the response alone.
    StoreUnavailable,
}

/// Refreshes the credential on a first 401 and replays the request once.
///
/// Refreshes are single-flight: a 401 that arrives while another request is
/// refreshing waits for it and replays with the token it produced.
pub struct AuthRefreshInterceptor {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    reauth: Arc<dyn ReauthHandler>,
    login_path: String,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl AuthRefreshInterceptor {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        reauth: Arc<dyn ReauthHandler>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            refresher,
            reauth,
            login_path: login_path.into(),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn obtain_fresh_token(&self, rejected_token: Option<&str>) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;

        let stored = match self.store.read().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read credentials for refresh");
                return RefreshOutcome::StoreUnavailable;
            }
        };

        if let Some(current) = stored.as_ref().map(Credentials::access_token) {
            if Some(current) != rejected_token {
                debug!("Credential already rotated by a concurrent refresh");
                return RefreshOutcome::Token(current.to_string());
            }
        }

        let Some(refresh_token) = stored
            .as_ref()
            .and_then(Credentials::refresh_token)
            .map(str::to_string)
        else {
            warn!("No refresh token stored, session dropped");
            self.end_session().await;
            return RefreshOutcome::Reauth;
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(response) => {
                let persisted = match response.refresh_token {
                    Some(rotated) => {
                        self.store
                            .write(Credentials::new(response.access_token.clone(), Some(rotated)))
                            .await
                    }
                    None => {
                        self.store
                            .write_access_token(SecretString::new(response.access_token.clone()))
                            .await
                    }
                };
                if let Err(e) = persisted {
                    warn!(error = %e, "Failed to persist refreshed credentials");
                }

                info!("Access token refreshed");
                RefreshOutcome::Token(response.access_token)
            }
            Err(failure) => {
                warn!(
                    status = failure.status_code,
                    "Token refresh failed: {}", failure.message
                );
                self.end_session().await;
                RefreshOutcome::Reauth
            }
        }
    }

    async fn end_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear credentials");
        }
        self.reauth.reauthenticate(&self.login_path);
    }
}

fn bearer_token(request: &HttpRequest) -> Option<&str> {
    request
        .header(AUTHORIZATION)
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

#[async_trait]
impl ResponseInterceptor for AuthRefreshInterceptor {
    async fn intercept(&self, exchange: Exchange, dispatcher: &dyn Dispatcher) -> Exchange {
        if exchange.status() != Some(401) {
            return exchange;
        }

        if exchange.request.retried {
            debug!(
                state = RefreshState::Replayed.as_str(),
                url = %exchange.request.url,
                "Replay rejected again, not refreshing"
            );
            return exchange;
        }

        debug!(
            state = RefreshState::Refreshing.as_str(),
            url = %exchange.request.url,
            "Unauthorized, refreshing credential"
        );

        match self.obtain_fresh_token(bearer_token(&exchange.request)).await {
            RefreshOutcome::Token(token) => {
                let mut replay = exchange.request.clone();
                replay.retried = true;
                replay.set_header(AUTHORIZATION, format!("{}{}", BEARER_PREFIX, token));

                let replayed = dispatcher.replay(replay).await;
                debug!(
                    state = RefreshState::Replayed.as_str(),
                    status = ?replayed.status(),
                    "Replayed request"
                );
                replayed
            }
            RefreshOutcome::Reauth => {
                debug!(state = RefreshState::Failed.as_str(), "Session ended");
                Exchange {
                    reauth_required: true,
                    ..exchange
                }
            }
            RefreshOutcome::StoreUnavailable => {
                debug!(
                    state = RefreshState::Fresh.as_str(),
                    "Credentials unreadable, returning original response"
                );
                exchange
            }
        }
    }
}
