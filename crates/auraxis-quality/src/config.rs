//! Environment for the local SonarCloud gate.

use crate::Rating;
use auraxis_core::{
    parse_bool_flag, parse_count, parse_positive_duration, AppConfigTrait, ConfigError,
    ConfigSource, EnvSource,
};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_ENV: &str = "SONAR_TOKEN";
pub const PROJECT_KEY_ENV: &str = "SONAR_PROJECT_KEY";
pub const ORGANIZATION_ENV: &str = "SONAR_ORGANIZATION";
pub const HOST_URL_ENV: &str = "SONAR_HOST_URL";
pub const TEST_COMMAND_ENV: &str = "SONAR_TEST_COMMAND";
pub const COVERAGE_REPORT_ENV: &str = "SONAR_COVERAGE_REPORT";
pub const SKIP_TESTS_ENV: &str = "SONAR_SKIP_TESTS";
pub const SCANNER_BIN_ENV: &str = "SONAR_SCANNER_BIN";
pub const SCAN_MAX_ATTEMPTS_ENV: &str = "SONAR_SCAN_MAX_ATTEMPTS";
pub const SCAN_RETRY_BASE_ENV: &str = "SONAR_SCAN_RETRY_BASE_SECONDS";
pub const LOCK_MARKER_ENV: &str = "SONAR_LOCK_MARKER";
pub const POLL_ATTEMPTS_ENV: &str = "SONAR_GATE_POLL_ATTEMPTS";
pub const POLL_INTERVAL_ENV: &str = "SONAR_GATE_POLL_INTERVAL_SECONDS";
pub const TARGET_RATING_ENV: &str = "SONAR_TARGET_RATING";

pub const DEFAULT_HOST_URL: &str = "https://sonarcloud.io";
pub const DEFAULT_TEST_COMMAND: &str = "pytest --cov=app --cov-report=xml:coverage.xml";
pub const DEFAULT_COVERAGE_REPORT: &str = "coverage.xml";
pub const DEFAULT_SCANNER_BIN: &str = "sonar-scanner";
pub const DEFAULT_SCAN_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SCAN_RETRY_BASE_SECONDS: f64 = 20.0;
pub const DEFAULT_LOCK_MARKER: &str = "analysis is already in progress";
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL_SECONDS: f64 = 10.0;

/// Clean up a value pasted into a shell profile or CI secret.
///
/// Trims whitespace, drops carriage returns and strips one pair of matching
/// surrounding quotes.
pub fn normalize_env_value(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| *c != '\r').collect();
    let trimmed = cleaned.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

fn normalized(env: &EnvSource, key: &str) -> Option<String> {
    env.get(key)
        .map(|raw| normalize_env_value(&raw))
        .filter(|value| !value.is_empty())
}

/// Local quality gate configuration
#[derive(Clone, PartialEq)]
pub struct SonarConfig {
    pub token: String,
    pub project_key: String,
    pub organization: String,
    pub host_url: String,
    /// Shell command producing the coverage report
    pub test_command: String,
    pub coverage_report: PathBuf,
    pub skip_tests: bool,
    pub scanner_bin: String,
    pub max_scan_attempts: u32,
    /// Wait before retry `n` is `retry_base * n`
    pub retry_base: Duration,
    pub lock_marker: String,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub target_rating: Rating,
}

impl SonarConfig {
    /// Linear backoff before the retry following `attempt` (1-based),
    /// saturating at `Duration::MAX`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_base.saturating_mul(attempt)
    }

    pub fn with_skip_tests(mut self, skip: bool) -> Self {
        self.skip_tests = skip;
        self
    }
}

impl fmt::Debug for SonarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonarConfig")
            .field("token", &"<redacted>")
            .field("project_key", &self.project_key)
            .field("organization", &self.organization)
            .field("host_url", &self.host_url)
            .field("test_command", &self.test_command)
            .field("coverage_report", &self.coverage_report)
            .field("skip_tests", &self.skip_tests)
            .field("scanner_bin", &self.scanner_bin)
            .field("max_scan_attempts", &self.max_scan_attempts)
            .field("retry_base", &self.retry_base)
            .field("lock_marker", &self.lock_marker)
            .field("poll_attempts", &self.poll_attempts)
            .field("poll_interval", &self.poll_interval)
            .field("target_rating", &self.target_rating)
            .finish()
    }
}

impl AppConfigTrait for SonarConfig {
    fn from_env_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let token = normalized(env, TOKEN_ENV);
        let project_key = normalized(env, PROJECT_KEY_ENV);
        let organization = normalized(env, ORGANIZATION_ENV);

        let missing: Vec<&str> = [
            (TOKEN_ENV, token.is_none()),
            (PROJECT_KEY_ENV, project_key.is_none()),
            (ORGANIZATION_ENV, organization.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(ConfigError::missing_required(
                missing.join(", "),
                "Export the SonarCloud token, project key and organization before running the gate.",
            ));
        }

        let raw_rating = normalized(env, TARGET_RATING_ENV).unwrap_or_else(|| "A".to_string());
        let target_rating: Rating = raw_rating
            .parse()
            .map_err(|_| ConfigError::invalid_value(TARGET_RATING_ENV, &raw_rating, "A-E or 1.0-5.0"))?;

        let config = Self {
            token: token.unwrap_or_default(),
            project_key: project_key.unwrap_or_default(),
            organization: organization.unwrap_or_default(),
            host_url: normalized(env, HOST_URL_ENV)
                .unwrap_or_else(|| DEFAULT_HOST_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            test_command: normalized(env, TEST_COMMAND_ENV)
                .unwrap_or_else(|| DEFAULT_TEST_COMMAND.to_string()),
            coverage_report: PathBuf::from(
                normalized(env, COVERAGE_REPORT_ENV)
                    .unwrap_or_else(|| DEFAULT_COVERAGE_REPORT.to_string()),
            ),
            skip_tests: normalized(env, SKIP_TESTS_ENV)
                .and_then(|v| parse_bool_flag(&v))
                .unwrap_or(false),
            scanner_bin: normalized(env, SCANNER_BIN_ENV)
                .unwrap_or_else(|| DEFAULT_SCANNER_BIN.to_string()),
            max_scan_attempts: parse_count(
                normalized(env, SCAN_MAX_ATTEMPTS_ENV).as_deref(),
                DEFAULT_SCAN_MAX_ATTEMPTS,
                1,
            ),
            retry_base: parse_positive_duration(
                normalized(env, SCAN_RETRY_BASE_ENV).as_deref(),
                Duration::from_secs_f64(DEFAULT_SCAN_RETRY_BASE_SECONDS),
            ),
            lock_marker: normalized(env, LOCK_MARKER_ENV)
                .unwrap_or_else(|| DEFAULT_LOCK_MARKER.to_string()),
            poll_attempts: parse_count(
                normalized(env, POLL_ATTEMPTS_ENV).as_deref(),
                DEFAULT_POLL_ATTEMPTS,
                1,
            ),
            poll_interval: parse_positive_duration(
                normalized(env, POLL_INTERVAL_ENV).as_deref(),
                Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECONDS),
            ),
            target_rating,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.host_url.starts_with("http://") && !self.host_url.starts_with("https://") {
            return Err(ConfigError::invalid_value(
                HOST_URL_ENV,
                &self.host_url,
                "an http(s) URL",
            ));
        }
        if !self.skip_tests && self.test_command.is_empty() {
            return Err(ConfigError::missing_required(
                TEST_COMMAND_ENV,
                "Set a test command or SONAR_SKIP_TESTS=1.",
            ));
        }
        Ok(())
    }

    fn config_sources(&self, env: &EnvSource) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();
        for (field, key, default) in [
            ("host_url", HOST_URL_ENV, DEFAULT_HOST_URL),
            ("test_command", TEST_COMMAND_ENV, DEFAULT_TEST_COMMAND),
            ("coverage_report", COVERAGE_REPORT_ENV, DEFAULT_COVERAGE_REPORT),
            ("scanner_bin", SCANNER_BIN_ENV, DEFAULT_SCANNER_BIN),
            ("lock_marker", LOCK_MARKER_ENV, DEFAULT_LOCK_MARKER),
            ("target_rating", TARGET_RATING_ENV, "A"),
        ] {
            sources.insert(field.to_string(), ConfigSource::for_keys(env, &[key], default));
        }
        sources
    }
}
