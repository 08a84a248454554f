use auraxis_core::EnvSource;
use auraxis_flags::config::CATALOG_ENV;
use auraxis_flags::{FeatureFlags, FlagsConfig, HygieneReport};
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Catalog path: explicit flag, then the environment, then the default location
fn catalog_path(env: &EnvSource, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| FlagsConfig::load(env).catalog_path)
}

/// Run the hygiene check and print its report. Returns the exit code.
pub fn check(catalog: Option<&Path>, prefix: &str, today: Option<NaiveDate>) -> i32 {
    run_check(&EnvSource::process(), catalog, prefix, today)
}

fn run_check(env: &EnvSource, catalog: Option<&Path>, prefix: &str, today: Option<NaiveDate>) -> i32 {
    let path = catalog_path(env, catalog);
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    tracing::debug!(catalog = %path.display(), %prefix, %today, "checking flag catalog");

    let report = HygieneReport::check(&path, prefix, today);
    for line in report.lines() {
        if report.passed() {
            println!("{}", line);
        } else {
            eprintln!("{}", line);
        }
    }
    report.exit_code()
}

/// Environment seen by the resolver, with the catalog path pinned when given
fn eval_env(base: EnvSource, catalog: Option<&Path>) -> EnvSource {
    match catalog {
        None => base,
        Some(path) => {
            let pinned = path.to_string_lossy().to_string();
            EnvSource::new(move |key| {
                if key == CATALOG_ENV {
                    Some(pinned.clone())
                } else {
                    base.get(key)
                }
            })
        }
    }
}

/// Resolve `key` and print the decision
pub async fn eval(
    key: &str,
    provider_value: Option<bool>,
    catalog: Option<&Path>,
    json: bool,
) -> anyhow::Result<i32> {
    let output = render_eval(EnvSource::process(), key, provider_value, catalog, json).await?;
    println!("{}", output);
    Ok(0)
}

async fn render_eval(
    env: EnvSource,
    key: &str,
    provider_value: Option<bool>,
    catalog: Option<&Path>,
    json: bool,
) -> anyhow::Result<String> {
    let flags = FeatureFlags::new(eval_env(env, catalog))?;
    let decision = flags.resolve(key, provider_value).await?;

    if json {
        Ok(serde_json::to_string_pretty(&decision)?)
    } else {
        Ok(format!(
            "{} = {} (source: {})",
            decision.key, decision.enabled, decision.source
        ))
    }
}
