//! End-to-end gate runs with real subprocesses and an in-process measures API

use auraxis_core::{AppConfigTrait, EnvSource};
use auraxis_quality::{
    LocalQualityGate, MeasuresSource, QualityError, SonarCloudClient, SonarConfig,
    SystemCommandRunner,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

struct MeasuresState {
    security: &'static str,
    requests: Mutex<Vec<(HashMap<String, String>, Option<String>)>>,
}

async fn component(
    State(state): State<Arc<MeasuresState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().push((params.clone(), auth.clone()));
    if auth.as_deref() != Some("Bearer squ_test") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "component": {
            "key": params.get("component").cloned().unwrap_or_default(),
            "measures": [
                {"metric": "reliability_rating", "value": "1.0"},
                {"metric": "security_rating", "value": state.security},
                {"metric": "sqale_rating", "value": "1.0"}
            ]
        }
    })))
}

async fn spawn_measures(security: &'static str) -> (String, Arc<MeasuresState>) {
    let state = Arc::new(MeasuresState {
        security,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/measures/component", get(component))
        .with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

/// Fake scanner: reports the project lock, after a Latin-1 line, until it has
/// run `locked_runs` times
fn write_scanner(dir: &Path, locked_runs: u32) -> String {
    let script = dir.join("fake-scanner.sh");
    let counter = dir.join("scanner-runs");
    let body = format!(
        "#!/bin/sh\n\
         n=$(cat '{counter}' 2>/dev/null || echo 0)\n\
         n=$((n + 1))\n\
         echo $n > '{counter}'\n\
         if [ -z \"$SONAR_TOKEN\" ]; then echo 'missing token' >&2; exit 9; fi\n\
         if [ $n -le {locked} ]; then printf 'caf\\351\\n' >&2; echo 'ERROR: Analysis is already in progress' >&2; exit 3; fi\n\
         echo \"EXECUTION SUCCESS $*\"\n",
        counter = counter.display(),
        locked = locked_runs,
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().to_string()
}

fn gate_config(dir: &Path, host: &str, scanner: &str, test_command: &str) -> SonarConfig {
    let report = dir.join("coverage.xml").to_string_lossy().to_string();
    let env = EnvSource::from_pairs([
        ("SONAR_TOKEN", "\"squ_test\"\r"),
        ("SONAR_PROJECT_KEY", "auraxis_api"),
        ("SONAR_ORGANIZATION", "auraxis"),
        ("SONAR_HOST_URL", host),
        ("SONAR_SCANNER_BIN", scanner),
        ("SONAR_TEST_COMMAND", test_command),
        ("SONAR_COVERAGE_REPORT", report.as_str()),
        ("SONAR_SCAN_RETRY_BASE_SECONDS", "0.01"),
        ("SONAR_GATE_POLL_INTERVAL_SECONDS", "0.01"),
    ]);
    SonarConfig::from_env_source(&env).unwrap()
}

fn run_counter(dir: &Path) -> u32 {
    std::fs::read_to_string(dir.join("scanner-runs"))
        .unwrap()
        .trim()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn test_full_gate_passes_after_lock_retry() {
    let dir = tempfile::tempdir().unwrap();
    let (host, state) = spawn_measures("1.0").await;
    let scanner = write_scanner(dir.path(), 1);
    let test_command = format!("echo '<coverage/>' > '{}'", dir.path().join("coverage.xml").display());
    let config = gate_config(dir.path(), &host, &scanner, &test_command);

    let client = SonarCloudClient::from_config(&config).unwrap();
    let gate = LocalQualityGate::new(config, SystemCommandRunner::quiet(), client);
    let report = gate.run().await.unwrap();

    assert!(report.tests_ran);
    assert_eq!(report.project_key, "auraxis_api");
    assert_eq!(run_counter(dir.path()), 2);

    let requests = state.requests.lock();
    let (params, auth) = &requests[0];
    assert_eq!(params["component"], "auraxis_api");
    assert_eq!(
        params["metricKeys"],
        "reliability_rating,security_rating,sqale_rating"
    );
    assert_eq!(auth.as_deref(), Some("Bearer squ_test"));
}

#[tokio::test]
async fn test_failing_test_command_propagates_code() {
    let dir = tempfile::tempdir().unwrap();
    let (host, _state) = spawn_measures("1.0").await;
    let scanner = write_scanner(dir.path(), 0);
    let config = gate_config(dir.path(), &host, &scanner, "exit 5");

    let client = SonarCloudClient::from_config(&config).unwrap();
    let gate = LocalQualityGate::new(config, SystemCommandRunner::quiet(), client);
    let error = gate.run().await.unwrap_err();

    assert!(matches!(error, QualityError::TestsFailed { code: 5 }));
    assert_eq!(error.exit_code(), 5);
    assert!(!dir.path().join("scanner-runs").exists());
}

#[tokio::test]
async fn test_persistent_lock_exhausts_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let (host, _state) = spawn_measures("1.0").await;
    let scanner = write_scanner(dir.path(), 10);
    let test_command = format!("touch '{}'", dir.path().join("coverage.xml").display());
    let config = gate_config(dir.path(), &host, &scanner, &test_command);

    let client = SonarCloudClient::from_config(&config).unwrap();
    let gate = LocalQualityGate::new(config, SystemCommandRunner::quiet(), client);
    let error = gate.run().await.unwrap_err();

    assert!(matches!(error, QualityError::ScannerLocked { code: 3, attempts: 3 }));
    assert_eq!(run_counter(dir.path()), 3);
}

#[tokio::test]
async fn test_rating_mismatch_from_api() {
    let dir = tempfile::tempdir().unwrap();
    let (host, _state) = spawn_measures("3.0").await;
    let scanner = write_scanner(dir.path(), 0);
    let test_command = format!("touch '{}'", dir.path().join("coverage.xml").display());
    let config = gate_config(dir.path(), &host, &scanner, &test_command);

    let client = SonarCloudClient::from_config(&config).unwrap();
    let gate = LocalQualityGate::new(config, SystemCommandRunner::quiet(), client);
    let error = gate.run().await.unwrap_err();

    assert_eq!(
        error.to_string(),
        "quality ratings below target: security_rating is C (expected A)"
    );
}

#[tokio::test]
async fn test_client_reports_http_errors() {
    let (host, _state) = spawn_measures("1.0").await;
    let client = SonarCloudClient::new(host, "wrong-token").unwrap();
    let error = client.fetch("auraxis_api").await.unwrap_err();
    assert!(matches!(error, QualityError::Api(ref message) if message.contains("401")));
}
