//! Flag resolution: caller value, provider, env overrides, then catalog.

use crate::overrides::parse_overrides;
use crate::provider::{FlagProvider, UnleashProvider};
use crate::{FlagCatalog, FlagResult, FlagsConfig};
use auraxis_core::EnvSource;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Which layer produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Value supplied by the caller
    Caller,
    /// Remote provider snapshot
    Provider,
    /// `AURAXIS_FEATURE_FLAGS` override
    Override,
    /// Local catalog status
    Catalog,
    /// Flag unknown everywhere
    Default,
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecisionSource::Caller => "caller",
            DecisionSource::Provider => "provider",
            DecisionSource::Override => "override",
            DecisionSource::Catalog => "catalog",
            DecisionSource::Default => "default",
        };
        write!(f, "{}", name)
    }
}

/// Resolved state of one flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub key: String,
    pub enabled: bool,
    pub source: DecisionSource,
}

/// Shared flag resolver.
///
/// Catalog and overrides are memoized on first use and dropped by
/// [`FeatureFlags::refresh`].
pub struct FeatureFlags {
    env: EnvSource,
    config: RwLock<FlagsConfig>,
    catalog: RwLock<Option<Arc<FlagCatalog>>>,
    overrides: RwLock<Option<Arc<HashMap<String, bool>>>>,
    provider: Arc<dyn FlagProvider>,
}

impl FeatureFlags {
    /// Resolver over the process environment with the Unleash provider
    pub fn from_env() -> FlagResult<Self> {
        Self::new(EnvSource::process())
    }

    /// Resolver over `env` with the Unleash provider
    pub fn new(env: EnvSource) -> FlagResult<Self> {
        let config = FlagsConfig::load(&env);
        let provider = Arc::new(UnleashProvider::new(config.clone())?);
        Ok(Self::build(env, config, provider))
    }

    /// Resolver over `env` with a custom provider
    pub fn with_provider(env: EnvSource, provider: Arc<dyn FlagProvider>) -> Self {
        let config = FlagsConfig::load(&env);
        provider.reconfigure(&config);
        Self::build(env, config, provider)
    }

    fn build(env: EnvSource, config: FlagsConfig, provider: Arc<dyn FlagProvider>) -> Self {
        Self {
            env,
            config: RwLock::new(config),
            catalog: RwLock::new(None),
            overrides: RwLock::new(None),
            provider,
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> FlagsConfig {
        self.config.read().clone()
    }

    /// Whether `key` is enabled
    pub async fn is_enabled(&self, key: &str, provider_value: Option<bool>) -> FlagResult<bool> {
        Ok(self.resolve(key, provider_value).await?.enabled)
    }

    /// Resolve `key` and report which layer decided
    pub async fn resolve(&self, key: &str, provider_value: Option<bool>) -> FlagResult<Decision> {
        let decided = |enabled, source| Decision {
            key: key.to_string(),
            enabled,
            source,
        };

        if let Some(enabled) = provider_value {
            return Ok(decided(enabled, DecisionSource::Caller));
        }

        if let Some(enabled) = self.provider_decision(key).await {
            return Ok(decided(enabled, DecisionSource::Provider));
        }

        if let Some(enabled) = self.overrides().get(key).copied() {
            return Ok(decided(enabled, DecisionSource::Override));
        }

        let catalog = self.catalog()?;
        let decision = match catalog.get(key) {
            Some(flag) => decided(flag.is_enabled_status(), DecisionSource::Catalog),
            None => decided(false, DecisionSource::Default),
        };
        tracing::trace!(target: "auraxis::flags", key, enabled = decision.enabled, source = %decision.source, "flag resolved");
        Ok(decision)
    }

    /// Provider decision for `key`, if the provider has one
    pub async fn provider_decision(&self, key: &str) -> Option<bool> {
        self.provider.decision(key).await
    }

    /// Re-read configuration and drop catalog, overrides and provider caches
    pub fn refresh(&self) {
        let config = FlagsConfig::load(&self.env);
        self.provider.reconfigure(&config);
        self.provider.invalidate();
        *self.config.write() = config;
        *self.catalog.write() = None;
        *self.overrides.write() = None;
        tracing::debug!(target: "auraxis::flags", "flag state refreshed");
    }

    /// Memoized catalog; load failures are returned and not memoized
    pub fn catalog(&self) -> FlagResult<Arc<FlagCatalog>> {
        if let Some(catalog) = self.catalog.read().as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let path = self.config.read().catalog_path.clone();
        let catalog = Arc::new(FlagCatalog::load(&path)?);
        *self.catalog.write() = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    fn overrides(&self) -> Arc<HashMap<String, bool>> {
        if let Some(overrides) = self.overrides.read().as_ref() {
            return Arc::clone(overrides);
        }

        let overrides = Arc::new(parse_overrides(&self.config.read().overrides_payload));
        *self.overrides.write() = Some(Arc::clone(&overrides));
        overrides
    }
}

impl fmt::Debug for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFlags")
            .field("env", &self.env)
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}
