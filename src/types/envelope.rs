//! Response Envelope
//!
//! The `{ success, data, message }` wrapper the backend puts around JSON
//! payloads. The client treats it as opaque; callers deserialize into it
//! when they want the wrapper fields.

use serde::{Deserialize, Serialize};

/// Standard backend response wrapper.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the backend reported success.
    #[serde(default)]
    pub success: bool,
    /// Payload.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Field-level errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ApiEnvelope<T> {
    /// Take the payload, if any.
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}
