//! Runtime resolution against the catalog shipped in `config/`

use auraxis_core::EnvSource;
use auraxis_flags::{FeatureFlags, HygieneReport, LocalOnlyProvider};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

const CALCULATOR: &str = "api.tools.salary-raise-calculator";

fn shipped_catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/feature-flags.json")
}

fn flags_with(extra: &[(&str, &str)]) -> FeatureFlags {
    let mut pairs = vec![(
        "AURAXIS_FEATURE_FLAGS_CATALOG".to_string(),
        shipped_catalog().display().to_string(),
    )];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    FeatureFlags::with_provider(EnvSource::from_pairs(pairs), Arc::new(LocalOnlyProvider))
}

#[tokio::test]
async fn test_feature_flag_uses_local_catalog_status() {
    let flags = flags_with(&[]);
    assert!(!flags.is_enabled(CALCULATOR, None).await.unwrap());
}

#[tokio::test]
async fn test_feature_flag_uses_provider_value_when_present() {
    let flags = flags_with(&[]);
    assert!(flags.is_enabled(CALCULATOR, Some(true)).await.unwrap());
}

#[tokio::test]
async fn test_feature_flag_uses_env_override() {
    let flags = flags_with(&[("AURAXIS_FEATURE_FLAGS", r#"{"api.tools.salary-raise-calculator": true}"#)]);
    assert!(flags.is_enabled(CALCULATOR, None).await.unwrap());
}

#[tokio::test]
async fn test_feature_flag_ignores_invalid_override_payload() {
    let flags = flags_with(&[("AURAXIS_FEATURE_FLAGS", "{invalid")]);
    assert!(!flags.is_enabled(CALCULATOR, None).await.unwrap());
}

#[test]
fn test_shipped_catalog_passes_hygiene() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
    let report = HygieneReport::check(&shipped_catalog(), "api", today);
    assert!(report.passed(), "{:?}", report.issues);
    assert_eq!(report.flag_count, 3);
}
