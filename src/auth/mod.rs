//! Authentication
//!
//! Credential storage, token refresh, and the interceptors that attach the
//! bearer credential and recover from an expired one.
//!
//! This module provides:
//!
//! - **Credential Store**: injectable storage for the access/refresh pair
//! - **Token Refresher**: exchange of a refresh token at the refresh endpoint
//! - **Interceptors**: bearer attachment and single-shot refresh-and-replay

pub mod interceptor;
pub mod refresh;
pub mod store;

// Credential Store
pub use store::{
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, MockCredentialStore,
    ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};

// Token Refresher
pub use refresh::{HttpTokenRefresher, TokenRefresher};

// Interceptors
pub use interceptor::{
    AuthRefreshInterceptor, BearerTokenInterceptor, NoopReauthHandler, ReauthHandler,
    RefreshState,
};
