use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::{GateStep, QualityError, QualityResult, SonarConfig};
use tracing::{info, warn};

/// Scanner invocation for `config`. The token travels in the environment,
/// never on the command line.
pub fn scanner_command(config: &SonarConfig) -> CommandSpec {
    CommandSpec::new(&config.scanner_bin)
        .arg(format!("-Dsonar.projectKey={}", config.project_key))
        .arg(format!("-Dsonar.organization={}", config.organization))
        .arg(format!("-Dsonar.host.url={}", config.host_url))
        .arg(format!(
            "-Dsonar.python.coverage.reportPaths={}",
            config.coverage_report.display()
        ))
        .env("SONAR_TOKEN", &config.token)
}

/// True when the output says another analysis holds the project lock
pub fn is_lock_contention(output: &str, marker: &str) -> bool {
    !marker.is_empty() && output.to_lowercase().contains(&marker.to_lowercase())
}

/// Run the scanner, retrying only on lock contention.
///
/// Waits `retry_base * attempt` between attempts. Any other failure is
/// returned straight away.
pub async fn run_scanner_with_retry<R>(runner: &R, config: &SonarConfig) -> QualityResult<CommandOutput>
where
    R: CommandRunner + ?Sized,
{
    let spec = scanner_command(config);
    let max_attempts = config.max_scan_attempts.max(1);
    let mut attempt = 1;

    loop {
        info!(target: "auraxis::quality", attempt, max_attempts, "running scanner");
        let output = runner
            .run(&spec)
            .await
            .map_err(|e| e.in_step(GateStep::Scanner))?;
        if output.success() {
            return Ok(output);
        }

        if !is_lock_contention(&output.output, &config.lock_marker) {
            return Err(QualityError::ScannerFailed {
                code: output.failure_code(),
                attempts: attempt,
            });
        }
        if attempt >= max_attempts {
            return Err(QualityError::ScannerLocked {
                code: output.failure_code(),
                attempts: attempt,
            });
        }

        let wait = config.backoff_for(attempt);
        warn!(
            target: "auraxis::quality",
            attempt,
            wait_secs = wait.as_secs_f64(),
            "analysis already in progress, retrying"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}
