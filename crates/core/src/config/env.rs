//! Environment variable access shared by every configuration struct.
//!
//! Configuration is read through an [`EnvSource`] instead of `std::env`
//! directly so callers can re-read it on refresh and tests can supply a
//! fixed set of variables without touching the process environment.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Cloneable lookup of environment-style key/value pairs
#[derive(Clone)]
pub struct EnvSource {
    lookup: Arc<Lookup>,
    label: &'static str,
}

impl EnvSource {
    /// Wrap an arbitrary lookup function
    pub fn new<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Arc::new(lookup),
            label: "custom",
        }
    }

    /// Read from the process environment
    pub fn process() -> Self {
        Self {
            lookup: Arc::new(|key| std::env::var(key).ok()),
            label: "process",
        }
    }

    /// Fixed set of variables, mostly for tests
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Arc::new(move |key| vars.get(key).cloned()),
            label: "fixed",
        }
    }

    /// Source with no variables at all
    pub fn empty() -> Self {
        Self::from_pairs(std::iter::empty::<(String, String)>())
    }

    /// Raw value for `key`, untouched
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    /// First key among `keys` whose trimmed value is non-empty, with that value
    pub fn first_non_empty(&self, keys: &[&str]) -> Option<(String, String)> {
        keys.iter().find_map(|key| {
            let value = self.get(key)?;
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some((key.to_string(), trimmed.to_string()))
            }
        })
    }

    /// Trimmed value of the first populated key, or `default`
    pub fn read_value(&self, keys: &[&str], default: &str) -> String {
        self.first_non_empty(keys)
            .map(|(_, value)| value)
            .unwrap_or_else(|| default.to_string())
    }

    /// Boolean interpretation of `key`; `None` when unset or unrecognized
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).as_deref().and_then(parse_bool_flag)
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvSource").field("label", &self.label).finish()
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::process()
    }
}

/// Interpret common truthy/falsy spellings.
pub fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a strictly positive number of seconds, falling back to `default`.
pub fn parse_positive_seconds(raw: Option<&str>, default: f64) -> f64 {
    match raw.map(str::trim).and_then(|value| value.parse::<f64>().ok()) {
        Some(seconds) if seconds > 0.0 && seconds.is_finite() => seconds,
        _ => default,
    }
}

/// Parse a strictly positive number of seconds as a [`Duration`], falling
/// back to `default`. Values too large to represent also fall back.
pub fn parse_positive_duration(raw: Option<&str>, default: Duration) -> Duration {
    let seconds = parse_positive_seconds(raw, default.as_secs_f64());
    Duration::try_from_secs_f64(seconds).unwrap_or(default)
}

/// Parse a positive count, falling back to `default`; values below `min` are raised to it.
pub fn parse_count(raw: Option<&str>, default: u32, min: u32) -> u32 {
    raw.map(str::trim)
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
        .max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_value_uses_precedence_order() {
        let env = EnvSource::from_pairs([
            ("AURAXIS_UNLEASH_ENVIRONMENT", ""),
            ("AURAXIS_RUNTIME_ENV", " staging "),
        ]);
        let value = env.read_value(
            &["AURAXIS_UNLEASH_ENVIRONMENT", "AURAXIS_RUNTIME_ENV"],
            "development",
        );
        assert_eq!(value, "staging");
    }

    #[test]
    fn test_read_value_default_when_all_blank() {
        let env = EnvSource::from_pairs([("AURAXIS_UNLEASH_APP_NAME", "   ")]);
        assert_eq!(
            env.read_value(&["AURAXIS_UNLEASH_APP_NAME"], "auraxis-api"),
            "auraxis-api"
        );
    }

    #[test]
    fn test_parse_bool_flag() {
        for truthy in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool_flag(truthy), Some(true), "{truthy}");
        }
        for falsy in ["0", "False", "no", "OFF"] {
            assert_eq!(parse_bool_flag(falsy), Some(false), "{falsy}");
        }
        assert_eq!(parse_bool_flag("maybe"), None);
        assert_eq!(parse_bool_flag(""), None);
    }

    #[test]
    fn test_parse_positive_seconds() {
        assert_eq!(parse_positive_seconds(Some("5"), 2.0), 5.0);
        assert_eq!(parse_positive_seconds(Some(" 0.5 "), 2.0), 0.5);
        assert_eq!(parse_positive_seconds(Some("0"), 2.0), 2.0);
        assert_eq!(parse_positive_seconds(Some("-3"), 2.0), 2.0);
        assert_eq!(parse_positive_seconds(Some("soon"), 30.0), 30.0);
        assert_eq!(parse_positive_seconds(None, 30.0), 30.0);
    }

    #[test]
    fn test_parse_positive_duration() {
        let default = Duration::from_secs(30);
        assert_eq!(
            parse_positive_duration(Some("1.5"), default),
            Duration::from_millis(1500)
        );
        assert_eq!(parse_positive_duration(Some("0"), default), default);
        assert_eq!(parse_positive_duration(Some("1e20"), default), default);
        assert_eq!(parse_positive_duration(Some("1e300"), default), default);
        assert_eq!(parse_positive_duration(None, default), default);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some("4"), 3, 1), 4);
        assert_eq!(parse_count(Some("0"), 3, 1), 1);
        assert_eq!(parse_count(Some("many"), 3, 1), 3);
        assert_eq!(parse_count(None, 10, 1), 10);
    }

    #[test]
    fn test_flag_lookup() {
        let env = EnvSource::from_pairs([("CI", "true"), ("SONAR_SKIP_TESTS", "later")]);
        assert_eq!(env.flag("CI"), Some(true));
        assert_eq!(env.flag("SONAR_SKIP_TESTS"), None);
        assert_eq!(env.flag("MISSING"), None);
    }
}
