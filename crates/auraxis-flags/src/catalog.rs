//! Local flag catalog (`config/feature-flags.json`).

use crate::{FlagError, FlagResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Catalog statuses that switch a flag on at runtime
pub const ENABLED_STATUSES: &[&str] = &["active", "released", "enabled"];

/// Textual form of a JSON scalar as it appears in catalog fields.
///
/// Strings are taken verbatim, `null` is empty and any other value uses its
/// JSON rendering.
pub(crate) fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct FlagDefinition {
    pub key: String,
    pub fields: Map<String, Value>,
}

impl FlagDefinition {
    /// Build from a raw catalog item; `None` for non-objects and blank keys
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let key = text_of(fields.get("key")).trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key,
            fields: fields.clone(),
        })
    }

    /// Trimmed, lowercased status
    pub fn status(&self) -> String {
        text_of(self.fields.get("status")).trim().to_lowercase()
    }

    pub fn owner(&self) -> Option<String> {
        let owner = text_of(self.fields.get("owner")).trim().to_string();
        if owner.is_empty() {
            None
        } else {
            Some(owner)
        }
    }

    pub fn is_enabled_status(&self) -> bool {
        ENABLED_STATUSES.contains(&self.status().as_str())
    }
}

/// Catalog indexed by flag key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagCatalog {
    flags: HashMap<String, FlagDefinition>,
}

impl FlagCatalog {
    /// Load the catalog at `path`. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> FlagResult<Self> {
        if !path.exists() {
            tracing::debug!(target: "auraxis::flags", path = %path.display(), "catalog not found");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| FlagError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let payload: Value = serde_json::from_str(&raw).map_err(|source| FlagError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_payload(&payload))
    }

    /// Index a parsed catalog document. Later duplicates replace earlier ones.
    pub fn from_payload(payload: &Value) -> Self {
        let entries = match payload.get("flags").and_then(Value::as_array) {
            Some(entries) => entries,
            None => return Self::default(),
        };

        let flags = entries
            .iter()
            .filter_map(FlagDefinition::from_value)
            .map(|flag| (flag.key.clone(), flag))
            .collect();
        Self { flags }
    }

    pub fn get(&self, key: &str) -> Option<&FlagDefinition> {
        self.flags.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Keys in lexical order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.flags.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
