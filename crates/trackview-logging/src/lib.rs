//! Structured JSONL logging with session context injection for Trackview
//!
//! Every Trackview binary and test harness goes through this crate to set up
//! `tracing`. Output is JSONL by default so that a live session's log can be
//! filtered by track or recording after the fact.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for log aggregation (default)
//! - **Session Context Injection**: Track, recording and session ids on every span
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use trackview_logging::{LogConfig, TrackviewSubscriberBuilder};
//!
//! // JSONL to console
//! let _guard = TrackviewSubscriberBuilder::new().try_init()?;
//!
//! // Pretty human-readable output
//! let _guard = TrackviewSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```
//!
//! # Session Context
//!
//! ```ignore
//! use tracing::Instrument;
//! use trackview_logging::SessionContextData;
//!
//! let ctx = SessionContextData::new("t1").with_recording_id("rec-1");
//! tokio::spawn(controller.run().instrument(ctx.span()));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{SessionContextData, SessionContextGuard, fields};
pub use error::LoggingError;
pub use layers::{SessionContextExtension, SessionContextLayer, jsonl_layer};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt};

/// Boxed layer stacked on the registry
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Subscriber produced by [`TrackviewSubscriberBuilder::build`]
pub type TrackviewSubscriber = Layered<EnvFilter, Layered<Vec<BoxedLayer>, Registry>>;

/// Builder for configuring and initializing the Trackview logging subscriber
///
/// By default, console output uses JSONL format. Use `LogConfig::development()`
/// for human-readable pretty output during development.
#[derive(Debug, Clone)]
pub struct TrackviewSubscriberBuilder {
    config: LogConfig,
    use_env: bool,
}

impl TrackviewSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
            use_env: true,
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Ignore `RUST_LOG` and always use the configured level
    pub fn ignore_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the subscriber without installing it
    ///
    /// The returned guard flushes file output when dropped and must outlive
    /// any logging the caller expects to reach disk.
    pub fn build(self) -> Result<(TrackviewSubscriber, Option<WorkerGuard>), LoggingError> {
        let filter = self.env_filter()?;

        let mut layers: Vec<BoxedLayer> = vec![SessionContextLayer::new().boxed()];
        let mut guard = None;

        if self.config.console.enabled {
            let console = &self.config.console;
            let layer = if console.pretty {
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(console.ansi)
                    .boxed()
            } else {
                jsonl_layer(std::io::stdout, &self.config.jsonl)
            };
            layers.push(layer);
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            layers.push(jsonl_layer(writer, &self.config.jsonl));
            guard = Some(file_guard);
        }

        let subscriber = tracing_subscriber::registry().with(layers).with(filter);
        Ok((subscriber, guard))
    }

    /// Install the subscriber as the global default
    ///
    /// Returns [`LoggingError::AlreadyInitialized`] if a global subscriber
    /// has already been set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let (subscriber, guard) = self.build()?;
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(guard)
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        if self.use_env {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        Ok(EnvFilter::try_new(&self.config.default_level)?)
    }
}

impl Default for TrackviewSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let file = File::create(config.single_file_path())?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("jsonl");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<Option<WorkerGuard>, LoggingError> {
    TrackviewSubscriberBuilder::new().try_init()
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<Option<WorkerGuard>, LoggingError> {
    TrackviewSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .try_init()
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = TrackviewSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = TrackviewSubscriberBuilder::new();
        assert_eq!(builder.config().default_level, "info");
        assert!(!builder.config().console.pretty); // JSONL by default
    }

    #[test]
    fn test_builder_with_config() {
        let builder = TrackviewSubscriberBuilder::new()
            .with_config(LogConfig::development())
            .with_level("trace")
            .with_console(false);
        assert_eq!(builder.config().default_level, "trace");
        assert!(builder.config().console.pretty);
        assert!(!builder.config().console.enabled);
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let result = TrackviewSubscriberBuilder::new()
            .with_level("trackview=loud")
            .ignore_env()
            .build();
        assert!(matches!(result, Err(LoggingError::InvalidFilter(_))));
    }

    #[test]
    fn test_build_without_file_has_no_guard() {
        let (_subscriber, guard) = TrackviewSubscriberBuilder::new()
            .with_console(false)
            .ignore_env()
            .build()
            .unwrap();
        assert!(guard.is_none());
    }
}
