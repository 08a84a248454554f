use super::EnvSource;

/// Configuration source information for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value loaded from environment variable
    EnvVar(String),
    /// Default value used
    Default(String),
    /// Value loaded from file
    File(String),
    /// Value provided programmatically
    Programmatic,
}

impl ConfigSource {
    /// Resolve which of `keys` supplied a value, falling back to `default`.
    ///
    /// Mirrors the precedence used by [`EnvSource::read_value`]: the first key
    /// holding a non-blank value wins.
    pub fn for_keys(env: &EnvSource, keys: &[&str], default: impl Into<String>) -> Self {
        match env.first_non_empty(keys) {
            Some((key, _)) => ConfigSource::EnvVar(key),
            None => ConfigSource::Default(default.into()),
        }
    }

    /// Check if source is environment variable
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    /// Check if source is default value
    pub fn is_default(&self) -> bool {
        matches!(self, ConfigSource::Default(_))
    }

    /// Check if source is from file
    pub fn is_file(&self) -> bool {
        matches!(self, ConfigSource::File(_))
    }

    /// Get source description
    pub fn description(&self) -> String {
        match self {
            ConfigSource::EnvVar(var) => format!("Environment variable: {}", var),
            ConfigSource::Default(value) => format!("Default value: {}", value),
            ConfigSource::File(path) => format!("Configuration file: {}", path),
            ConfigSource::Programmatic => "Programmatically set".to_string(),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_keys_prefers_first_populated_key() {
        let env = EnvSource::from_pairs([
            ("AURAXIS_UNLEASH_URL", "  "),
            ("AURAXIS_UNLEASH_PROXY_URL", "http://proxy"),
        ]);
        let source = ConfigSource::for_keys(
            &env,
            &["AURAXIS_UNLEASH_URL", "AURAXIS_UNLEASH_PROXY_URL"],
            "",
        );
        assert_eq!(source, ConfigSource::EnvVar("AURAXIS_UNLEASH_PROXY_URL".to_string()));
        assert!(source.is_env_var());
    }

    #[test]
    fn test_for_keys_falls_back_to_default() {
        let env = EnvSource::empty();
        let source = ConfigSource::for_keys(&env, &["AURAXIS_FLAG_PROVIDER"], "local");
        assert!(source.is_default());
        assert_eq!(source.to_string(), "Default value: local");
    }
}
