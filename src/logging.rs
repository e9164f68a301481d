//! Logging setup for service-container
//!
//! Every container event is emitted under the `service_container` target:
//! registrations and overrides, provider builds, activations (debug), cache
//! hits (trace) and detected cycles (warn).
//!
//! # Features
//!
//! - `logging` - Emit container events through `tracing` (default)
//! - `logging-json` - Install a JSON subscriber (recommended for production)
//! - `logging-pretty` - Install a pretty subscriber (recommended for development)
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::logging;
//!
//! // Only container events, pretty-printed, including trace-level cache hits
//! logging::builder()
//!     .trace()
//!     .pretty()
//!     .container_only()
//!     .init();
//! ```

use tracing::Level;

/// Target used by every event this crate emits
pub const TARGET: &str = "service_container";

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (includes singleton cache hits)
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    /// Only cycle warnings are emitted at this level
    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container logs
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Include thread IDs; useful when diagnosing racing singleton access
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// The filter directive this builder installs
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string().to_lowercase(),
        }
    }

    /// Install the configured subscriber as the global default.
    ///
    /// Fails if a global subscriber is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => fmt::layer()
                .json()
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
            // Compact, and Json when the json formatter is not compiled in
            _ => fmt::layer()
                .compact()
                .with_thread_ids(self.with_thread_ids)
                .with_thread_names(self.with_thread_names)
                .with_target(true)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
    }

    /// Install the configured subscriber, ignoring an already-installed one.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// No-op without `logging-json` or `logging-pretty`
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
///
/// Uses JSON format if `logging-json` is enabled, otherwise pretty.
pub fn init() {
    #[cfg(feature = "logging-json")]
    builder().json().init();

    #[cfg(not(feature = "logging-json"))]
    builder().pretty().init();
}

/// Initialize logging for container events only (filters other crates)
pub fn init_container_only() {
    builder().container_only().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
        assert!(builder.target.is_none());
        assert_eq!(builder.directive(), "debug");
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .pretty()
            .with_thread_ids()
            .container_only();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_thread_ids);
        assert_eq!(builder.target, Some(TARGET));
        assert_eq!(builder.directive(), "service_container=TRACE");
    }
}
