//! Types
//!
//! Credential and response envelope types shared by the client layers.

pub mod credentials;
pub mod envelope;

pub use credentials::{Credentials, RefreshRequest, RefreshResponse};
pub use envelope::ApiEnvelope;
