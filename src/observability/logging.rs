//! Logging configuration.
//!
//! Builds a `tracing-subscriber` registry with an `EnvFilter` and one of
//! three output formats.

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The minimum log level to capture
    pub level: LogLevel,
    /// The output format for log messages
    pub format: LogFormat,
    /// Whether to include timestamps in log output
    pub include_timestamps: bool,
    /// Whether to include the module target in log output
    pub include_target: bool,
    /// Whether to include file and line number in log output
    pub include_file_line: bool,
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        LevelFilter::from_level(level.into())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (for development)
    Pretty,
    /// JSON format (for structured logging in production)
    Json,
    /// Compact single-line format
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            include_timestamps: true,
            include_target: true,
            include_file_line: false,
        }
    }
}

impl LoggingConfig {
    /// Creates a new logging configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the log format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets whether to include timestamps.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    /// Sets whether to include the module target.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Sets whether to include file and line number.
    pub fn with_file_line(mut self, include: bool) -> Self {
        self.include_file_line = include;
        self
    }

    /// Environment filter: `RUST_LOG` directives plus the configured level.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::from_default_env().add_directive(LevelFilter::from(self.level).into())
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_target(self.include_target)
            .with_file(self.include_file_line)
            .with_line_number(self.include_file_line);

        match (self.format, self.include_timestamps) {
            (LogFormat::Pretty, true) => layer.with_ansi(true).boxed(),
            (LogFormat::Pretty, false) => layer.with_ansi(true).without_time().boxed(),
            (LogFormat::Json, true) => layer.json().boxed(),
            (LogFormat::Json, false) => layer.json().without_time().boxed(),
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        }
    }

    /// Initialize logging with this configuration.
    ///
    /// This should be called once at application startup.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber has already been installed.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing_subscriber::registry()
            .with(self.fmt_layer())
            .with(self.env_filter())
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.include_timestamps);
        assert!(config.include_target);
        assert!(!config.include_file_line);
    }

    #[test]
    fn test_logging_config_builder_chain() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Trace)
            .with_format(LogFormat::Compact)
            .with_timestamps(false)
            .with_target(false)
            .with_file_line(true);

        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.include_timestamps);
        assert!(!config.include_target);
        assert!(config.include_file_line);
    }

    #[test]
    fn test_log_level_conversions() {
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
    }

    #[test]
    fn test_every_format_builds_a_layer() {
        for format in [LogFormat::Pretty, LogFormat::Json, LogFormat::Compact] {
            for timestamps in [true, false] {
                let config = LoggingConfig::new()
                    .with_format(format)
                    .with_timestamps(timestamps);
                let _layer = config.fmt_layer();
            }
        }
    }

    #[test]
    fn test_init_twice_fails() {
        // The first call may lose to another test in this binary.
        let _ = LoggingConfig::new().with_level(LogLevel::Warn).init();
        assert!(LoggingConfig::new().init().is_err());
    }
}
