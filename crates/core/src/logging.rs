//! # Logging
//!
//! `tracing` subscriber setup for the auraxis binaries. Output goes to
//! stderr so command results printed on stdout stay machine-readable.

use crate::CoreError;
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Include the event target in each line
    pub include_target: bool,
    /// Environment filter (supports complex filters like "auraxis=debug,reqwest=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_target: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Verbose local runs
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            include_target: true,
            env_filter: Some("auraxis=debug,reqwest=info,hyper=warn".to_string()),
        }
    }

    /// CI runs: JSON lines for log collectors
    pub fn ci() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            include_target: true,
            env_filter: Some("auraxis=info,reqwest=warn,hyper=warn".to_string()),
        }
    }

    /// Create test logging configuration (minimal output)
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            include_target: false,
            env_filter: Some("auraxis=error".to_string()),
        }
    }

    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Directive string handed to [`EnvFilter`] when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> &str {
        self.env_filter.as_deref().unwrap_or(&self.level)
    }
}

/// Initialize logging for the process.
///
/// A subscriber that is already installed is left in place.
pub fn init_logging(config: &LoggingConfig) -> Result<(), CoreError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))
        .map_err(|e| {
            CoreError::configuration(format!(
                "invalid log filter '{}': {}",
                config.filter_directive(),
                e
            ))
        })?;

    let result = if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                Layer::new()
                    .with_writer(io::stderr)
                    .with_target(config.include_target)
                    .json(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                Layer::new()
                    .with_writer(io::stderr)
                    .with_target(config.include_target),
            )
            .try_init()
    };

    if result.is_err() {
        tracing::debug!(target: "auraxis::logging", "subscriber already installed");
        return Ok(());
    }

    tracing::debug!(
        target: "auraxis::logging",
        level = %config.level,
        format = if config.json_format { "json" } else { "text" },
        "logging initialized"
    );
    Ok(())
}
