//! Error Types
//!
//! Layered error hierarchy. Transport, storage and configuration failures
//! each have their own enum; everything a caller of the client sees is
//! normalized into [`FailureInfo`].

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Failure code for unreachable hosts and broken connections.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Failure code for requests that hit the transport timeout.
pub const TIMEOUT: &str = "TIMEOUT";
/// Failure code for success responses whose body could not be decoded.
pub const PARSE_ERROR: &str = "PARSE_ERROR";
/// Failure code attached when the session was dropped and the user must sign in again.
pub const REAUTH_REQUIRED: &str = "REAUTH_REQUIRED";
/// Failure code for requests that could not be built or sent as described.
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

const GENERIC_TRANSPORT_MESSAGE: &str = "Network error occurred";
const GENERIC_HTTP_MESSAGE: &str = "Request failed";

/// Normalized failure shape surfaced to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (status {status_code})")]
pub struct FailureInfo {
    /// Human-readable message, server-supplied when available.
    pub message: String,
    /// HTTP status code, 0 when no response was received.
    pub status_code: u16,
    /// Field-level errors reported by the server.
    pub errors: Vec<String>,
    /// Transport or client failure code.
    pub code: Option<String>,
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, FailureInfo>;

impl FailureInfo {
    /// Create a failure with just a message and status.
    pub fn new(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code,
            errors: Vec::new(),
            code: None,
        }
    }

    /// Attach a failure code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Normalize a non-2xx HTTP response.
    ///
    /// Each field is read on its own, so an unexpected shape in one does not
    /// discard the others.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();

        let message = parsed
            .as_ref()
            .and_then(|b| server_text(b.get("message")).or_else(|| server_text(b.get("error"))))
            .unwrap_or_else(|| format!("{} (HTTP {})", GENERIC_HTTP_MESSAGE, status));

        let mut errors = Vec::new();
        if let Some(list) = parsed.as_ref().and_then(|b| b.get("errors")) {
            collect_error_messages(list, &mut errors);
        }

        Self {
            message,
            status_code: status,
            errors,
            code: None,
        }
    }

    /// Normalize a transport-level failure (no response received).
    pub fn from_transport(error: &TransportError) -> Self {
        Self {
            message: GENERIC_TRANSPORT_MESSAGE.to_string(),
            status_code: 0,
            errors: Vec::new(),
            code: Some(error.code().to_string()),
        }
    }

    /// Whether the status or code marks a transient failure.
    pub fn is_retryable(&self) -> bool {
        self.status_code >= 500
            || self.status_code == 429
            || self.status_code == 408
            || matches!(self.code.as_deref(), Some(NETWORK_ERROR) | Some(TIMEOUT))
    }

    /// Whether the server rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code == 401
    }

    /// Whether the session was dropped and the user must sign in again.
    pub fn needs_reauth(&self) -> bool {
        self.code.as_deref() == Some(REAUTH_REQUIRED)
    }
}

/// A non-empty string, or the `message` of an object.
fn server_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Object(map) => server_text(map.get("message")),
        _ => None,
    }
}

/// Flatten a server `errors` value: strings, lists, objects keyed by field,
/// and `{ "message": .. }` entries. Other scalars are dropped.
fn collect_error_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => out.push(text.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_error_messages(item, out)),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(text)) => out.push(text.clone()),
            _ => map.values().for_each(|item| collect_error_messages(item, out)),
        },
        _ => {}
    }
}

/// Network/transport error. Produced before any HTTP status is available.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Failed to read response body: {message}")]
    Body { message: String },
}

impl TransportError {
    /// Failure code carried into [`FailureInfo`].
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => TIMEOUT,
            Self::Connection { .. } | Self::Body { .. } => NETWORK_ERROR,
            Self::InvalidRequest { .. } => INVALID_REQUEST,
        }
    }
}

impl From<TransportError> for FailureInfo {
    fn from(error: TransportError) -> Self {
        FailureInfo::from_transport(&error)
    }
}

/// Credential storage error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

impl From<StorageError> for FailureInfo {
    fn from(error: StorageError) -> Self {
        FailureInfo::new(error.to_string(), 0).with_code("STORAGE_ERROR")
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

impl From<ConfigurationError> for FailureInfo {
    fn from(error: ConfigurationError) -> Self {
        FailureInfo::new(error.to_string(), 0).with_code(INVALID_REQUEST)
    }
}
