//! Credential Types
//!
//! Bearer credential pair issued at login and rotated by the refresh path.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair.
#[derive(Clone)]
pub struct Credentials {
    /// Bearer token attached to every request.
    pub access_token: SecretString,
    /// Token exchanged for a new access token on 401.
    pub refresh_token: Option<SecretString>,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: refresh_token.map(SecretString::new),
        }
    }

    /// Get the access token value (for the Authorization header).
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Get the refresh token value.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Check if has refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body returned by the refresh endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    /// Rotated refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_tokens() {
        let credentials = Credentials::new("access-123", Some("refresh-456".to_string()));
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("access-123"));
        assert!(!debug.contains("refresh-456"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_accessors() {
        let credentials = Credentials::new("access-123", None);
        assert_eq!(credentials.access_token(), "access-123");
        assert_eq!(credentials.refresh_token(), None);
        assert!(!credentials.has_refresh_token());
    }

    #[test]
    fn test_refresh_wire_format() {
        let body = serde_json::to_string(&RefreshRequest {
            refresh_token: "r-1",
        })
        .unwrap();
        assert_eq!(body, r#"{"refreshToken":"r-1"}"#);

        let response: RefreshResponse =
            serde_json::from_str(r#"{"accessToken":"a-2"}"#).unwrap();
        assert_eq!(response.access_token, "a-2");
        assert!(response.refresh_token.is_none());
    }
}
