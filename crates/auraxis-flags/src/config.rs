//! Runtime settings for flag resolution, read from `AURAXIS_*` variables.

use auraxis_core::{
    parse_positive_duration, AppConfigTrait, ConfigError, ConfigSource, EnvSource,
};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const OVERRIDE_ENV: &str = "AURAXIS_FEATURE_FLAGS";
pub const CATALOG_ENV: &str = "AURAXIS_FEATURE_FLAGS_CATALOG";
pub const PROVIDER_ENV: &str = "AURAXIS_FLAG_PROVIDER";
pub const UNLEASH_URL_ENVS: &[&str] = &["AURAXIS_UNLEASH_URL", "AURAXIS_UNLEASH_PROXY_URL"];
pub const UNLEASH_TOKEN_ENVS: &[&str] = &["AURAXIS_UNLEASH_API_TOKEN", "AURAXIS_UNLEASH_CLIENT_KEY"];
pub const UNLEASH_APP_NAME_ENV: &str = "AURAXIS_UNLEASH_APP_NAME";
pub const UNLEASH_INSTANCE_ID_ENV: &str = "AURAXIS_UNLEASH_INSTANCE_ID";
pub const UNLEASH_ENVIRONMENT_ENVS: &[&str] =
    &["AURAXIS_UNLEASH_ENVIRONMENT", "AURAXIS_RUNTIME_ENV"];
pub const UNLEASH_TIMEOUT_ENV: &str = "AURAXIS_UNLEASH_TIMEOUT_SECONDS";
pub const UNLEASH_CACHE_TTL_ENV: &str = "AURAXIS_UNLEASH_CACHE_TTL_SECONDS";

pub const DEFAULT_CATALOG_PATH: &str = "config/feature-flags.json";
pub const DEFAULT_APP_NAME: &str = "auraxis-api";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 2.0;
pub const DEFAULT_CACHE_TTL_SECONDS: f64 = 30.0;

/// Where remote flag decisions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Catalog and overrides only
    Local,
    /// Unleash-compatible client API
    Unleash,
}

impl ProviderMode {
    /// Unknown values fall back to local resolution.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "unleash" => ProviderMode::Unleash,
            _ => ProviderMode::Local,
        }
    }
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderMode::Local => write!(f, "local"),
            ProviderMode::Unleash => write!(f, "unleash"),
        }
    }
}

/// Flag runtime configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FlagsConfig {
    pub provider_mode: ProviderMode,
    /// Base URL without trailing slash; empty disables the provider
    pub unleash_url: String,
    pub unleash_token: Option<String>,
    pub app_name: String,
    pub instance_id: String,
    pub environment: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    /// Raw JSON object from `AURAXIS_FEATURE_FLAGS`
    pub overrides_payload: String,
    pub catalog_path: PathBuf,
}

impl FlagsConfig {
    /// Read every setting; unusable values fall back to defaults.
    pub fn load(env: &EnvSource) -> Self {
        let token = env.read_value(UNLEASH_TOKEN_ENVS, "");
        Self {
            provider_mode: ProviderMode::parse(&env.read_value(&[PROVIDER_ENV], "local")),
            unleash_url: env.read_value(UNLEASH_URL_ENVS, "").trim_end_matches('/').to_string(),
            unleash_token: if token.is_empty() { None } else { Some(token) },
            app_name: env.read_value(&[UNLEASH_APP_NAME_ENV], DEFAULT_APP_NAME),
            instance_id: env.read_value(&[UNLEASH_INSTANCE_ID_ENV], DEFAULT_APP_NAME),
            environment: env.read_value(UNLEASH_ENVIRONMENT_ENVS, DEFAULT_ENVIRONMENT),
            timeout: parse_positive_duration(
                env.get(UNLEASH_TIMEOUT_ENV).as_deref(),
                Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS),
            ),
            cache_ttl: parse_positive_duration(
                env.get(UNLEASH_CACHE_TTL_ENV).as_deref(),
                Duration::from_secs_f64(DEFAULT_CACHE_TTL_SECONDS),
            ),
            overrides_payload: env.get(OVERRIDE_ENV).unwrap_or_default().trim().to_string(),
            catalog_path: PathBuf::from(env.read_value(&[CATALOG_ENV], DEFAULT_CATALOG_PATH)),
        }
    }

    /// Remote lookups happen only in unleash mode with a URL configured
    pub fn provider_enabled(&self) -> bool {
        self.provider_mode == ProviderMode::Unleash && !self.unleash_url.is_empty()
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self::load(&EnvSource::empty())
    }
}

impl AppConfigTrait for FlagsConfig {
    fn from_env_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let config = Self::load(env);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_mode == ProviderMode::Unleash && self.unleash_url.is_empty() {
            tracing::warn!(
                target: "auraxis::flags",
                "unleash provider selected without a URL; remote decisions are disabled"
            );
        }
        if self.catalog_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                CATALOG_ENV,
                "",
                "path to the flag catalog JSON file",
            ));
        }
        Ok(())
    }

    fn config_sources(&self, env: &EnvSource) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        sources.insert(
            "provider_mode".to_string(),
            ConfigSource::for_keys(env, &[PROVIDER_ENV], "local"),
        );
        sources.insert(
            "unleash_url".to_string(),
            ConfigSource::for_keys(env, UNLEASH_URL_ENVS, ""),
        );
        sources.insert(
            "environment".to_string(),
            ConfigSource::for_keys(env, UNLEASH_ENVIRONMENT_ENVS, DEFAULT_ENVIRONMENT),
        );
        sources.insert(
            "catalog_path".to_string(),
            ConfigSource::for_keys(env, &[CATALOG_ENV], DEFAULT_CATALOG_PATH),
        );
        sources
    }
}
