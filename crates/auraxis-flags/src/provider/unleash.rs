//! Unleash client API provider with a TTL snapshot cache

use super::{FlagProvider, FlagSnapshot};
use crate::{FlagError, FlagResult, FlagsConfig};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, StatusCode,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const UNLEASH_FEATURES_PATH: &str = "/api/client/features";

const APP_NAME_HEADER: HeaderName = HeaderName::from_static("unleash-appname");
const INSTANCE_ID_HEADER: HeaderName = HeaderName::from_static("unleash-instanceid");
const ENVIRONMENT_HEADER: HeaderName = HeaderName::from_static("unleash-environment");

/// Decode the `features` list of a client API response.
///
/// Entries need a non-blank `name` and a boolean `enabled`; anything else
/// is skipped.
pub fn parse_unleash_payload(payload: &Value) -> FlagSnapshot {
    let Some(features) = payload.get("features").and_then(Value::as_array) else {
        return FlagSnapshot::new();
    };

    features
        .iter()
        .filter_map(|feature| {
            let name = crate::catalog::text_of(feature.get("name")).trim().to_string();
            let enabled = feature.get("enabled")?.as_bool()?;
            if name.is_empty() {
                None
            } else {
                Some((name, enabled))
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    #[default]
    Stale,
    At(Instant),
    /// TTL reaches past what `Instant` can represent
    Never,
}

impl Expiry {
    fn after(now: Instant, ttl: std::time::Duration) -> Self {
        now.checked_add(ttl).map_or(Expiry::Never, Expiry::At)
    }
}

#[derive(Debug, Default)]
struct CachedSnapshot {
    snapshot: Arc<FlagSnapshot>,
    expiry: Expiry,
}

impl CachedSnapshot {
    fn fresh(&self, now: Instant) -> Option<Arc<FlagSnapshot>> {
        match self.expiry {
            Expiry::At(expires_at) if now < expires_at => Some(Arc::clone(&self.snapshot)),
            Expiry::Never => Some(Arc::clone(&self.snapshot)),
            _ => None,
        }
    }
}

/// Unleash-compatible provider using reqwest
pub struct UnleashProvider {
    client: Client,
    config: RwLock<FlagsConfig>,
    cache: Mutex<CachedSnapshot>,
}

impl UnleashProvider {
    /// Create new Unleash provider
    pub fn new(config: FlagsConfig) -> FlagResult<Self> {
        let client = Client::builder()
            .user_agent(auraxis_core::user_agent())
            .build()
            .map_err(|e| FlagError::provider(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: RwLock::new(config),
            cache: Mutex::new(CachedSnapshot::default()),
        })
    }

    /// Build request headers
    fn build_headers(config: &FlagsConfig) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let values = [
            (APP_NAME_HEADER, Some(config.app_name.as_str())),
            (INSTANCE_ID_HEADER, Some(config.instance_id.as_str())),
            (ENVIRONMENT_HEADER, Some(config.environment.as_str())),
            (AUTHORIZATION, config.unleash_token.as_deref()),
        ];
        for (name, value) in values {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(header) => {
                    headers.insert(name, header);
                }
                Err(_) => warn!(target: "auraxis::flags", header = name.as_str(), "skipping header with invalid characters"),
            }
        }

        headers
    }

    async fn fetch(&self, config: &FlagsConfig) -> Result<FlagSnapshot, String> {
        let url = format!("{}{}", config.unleash_url, UNLEASH_FEATURES_PATH);
        debug!(target: "auraxis::flags", %url, "fetching provider snapshot");

        let response = self
            .client
            .get(&url)
            .headers(Self::build_headers(config))
            .timeout(config.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("unexpected status {}", status));
        }

        let payload: Value = response.json().await.map_err(|e| e.to_string())?;
        Ok(parse_unleash_payload(&payload))
    }
}

#[async_trait]
impl FlagProvider for UnleashProvider {
    async fn snapshot(&self) -> Arc<FlagSnapshot> {
        let config = self.config.read().clone();
        if !config.provider_enabled() {
            return Arc::new(FlagSnapshot::new());
        }

        let now = Instant::now();
        let cached = self.cache.lock().fresh(now);
        if let Some(snapshot) = cached {
            return snapshot;
        }

        match self.fetch(&config).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                debug!(target: "auraxis::flags", flags = snapshot.len(), "provider snapshot cached");
                *self.cache.lock() = CachedSnapshot {
                    snapshot: Arc::clone(&snapshot),
                    expiry: Expiry::after(now, config.cache_ttl),
                };
                snapshot
            }
            Err(reason) => {
                warn!(target: "auraxis::flags", %reason, "provider unavailable, using local flags");
                Arc::new(FlagSnapshot::new())
            }
        }
    }

    fn invalidate(&self) {
        *self.cache.lock() = CachedSnapshot::default();
    }

    fn reconfigure(&self, config: &FlagsConfig) {
        *self.config.write() = config.clone();
        self.invalidate();
    }
}
