use crate::config::{ConfigError, ConfigSource, EnvSource};
use std::collections::HashMap;

/// Configuration trait implemented by every env-backed settings struct
pub trait AppConfigTrait: Sized {
    /// Load configuration from the given environment source
    fn from_env_source(env: &EnvSource) -> Result<Self, ConfigError>;

    /// Load configuration from the process environment
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_source(&EnvSource::process())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self, env: &EnvSource) -> HashMap<String, ConfigSource>;
}
