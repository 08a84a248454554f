use auraxis_core::EnvSource;
use auraxis_quality::{run_local_gate, EnforcementMode};

/// Run the local quality gate against the process environment.
///
/// The returned code is already mode-adjusted: advisory runs return 0.
pub async fn check(mode: Option<EnforcementMode>, skip_tests: bool) -> i32 {
    run_local_gate(&EnvSource::process(), mode, skip_tests).await
}
