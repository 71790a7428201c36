//! Observability
//!
//! Structured logging setup. Library code emits `tracing` events; the
//! application decides where they go by calling [`LoggingConfig::init`].
//!
//! ```rust,no_run
//! use touriquest_integration::observability::{LogFormat, LogLevel, LoggingConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! LoggingConfig::new()
//!     .with_level(LogLevel::Debug)
//!     .with_format(LogFormat::Json)
//!     .init()?;
//! # Ok(())
//! # }
//! ```

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Install the global subscriber described by `config`.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.clone().init()
}
