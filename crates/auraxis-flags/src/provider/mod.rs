//! Remote flag providers

use crate::FlagsConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub mod unleash;

pub use unleash::{parse_unleash_payload, UnleashProvider, UNLEASH_FEATURES_PATH};

/// Flag decisions reported by a provider, keyed by flag name
pub type FlagSnapshot = HashMap<String, bool>;

/// Source of remote flag decisions.
///
/// Providers never fail the caller: an unreachable or misbehaving service
/// yields an empty snapshot so resolution falls through to local sources.
#[async_trait]
pub trait FlagProvider: Send + Sync {
    /// Current decisions, possibly served from a cache
    async fn snapshot(&self) -> Arc<FlagSnapshot>;

    /// Drop any cached snapshot
    fn invalidate(&self);

    /// Pick up new settings after a refresh
    fn reconfigure(&self, _config: &FlagsConfig) {}

    /// Decision for a single flag
    async fn decision(&self, key: &str) -> Option<bool> {
        self.snapshot().await.get(key).copied()
    }
}

/// Provider that never has an opinion
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnlyProvider;

#[async_trait]
impl FlagProvider for LocalOnlyProvider {
    async fn snapshot(&self) -> Arc<FlagSnapshot> {
        Arc::new(FlagSnapshot::new())
    }

    fn invalidate(&self) {}
}

/// Provider with a fixed set of decisions
#[derive(Debug, Default, Clone)]
pub struct StaticProvider {
    decisions: Arc<FlagSnapshot>,
}

impl StaticProvider {
    pub fn new<I, K>(decisions: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            decisions: Arc::new(decisions.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

#[async_trait]
impl FlagProvider for StaticProvider {
    async fn snapshot(&self) -> Arc<FlagSnapshot> {
        Arc::clone(&self.decisions)
    }

    fn invalidate(&self) {}
}
