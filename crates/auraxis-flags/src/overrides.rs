use auraxis_core::parse_bool_flag;
use serde_json::Value;
use std::collections::HashMap;

/// Coerce a JSON value to a boolean decision.
///
/// Booleans pass through, `null` has no decision and everything else goes
/// through the usual truthy/falsy spellings.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Null => None,
        Value::String(s) => parse_bool_flag(s),
        other => parse_bool_flag(&other.to_string()),
    }
}

/// Parse the `AURAXIS_FEATURE_FLAGS` payload.
///
/// Anything other than a JSON object yields no overrides.
pub fn parse_overrides(raw: &str) -> HashMap<String, bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return HashMap::new();
    }

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(target: "auraxis::flags", error = %e, "ignoring malformed flag overrides");
            return HashMap::new();
        }
    };

    let Some(entries) = parsed.as_object() else {
        return HashMap::new();
    };

    entries
        .iter()
        .filter_map(|(key, value)| coerce_bool(value).map(|enabled| (key.clone(), enabled)))
        .collect()
}
