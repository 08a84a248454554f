//! The local quality gate pipeline: tests with coverage, scanner, ratings.

use crate::measures::{evaluate_ratings, poll_ratings, MeasuresSource, Rating, SonarCloudClient};
use crate::mode::{soft_fail, EnforcementMode};
use crate::runner::{CommandRunner, CommandSpec, SystemCommandRunner};
use crate::scanner::run_scanner_with_retry;
use crate::{GateStep, QualityError, QualityResult, SonarConfig};
use auraxis_core::{AppConfigTrait, EnvSource};
use tracing::info;

/// Outcome of a passing gate run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub project_key: String,
    pub tests_ran: bool,
    pub ratings: Vec<(String, Rating)>,
}

pub struct LocalQualityGate<R, M> {
    config: SonarConfig,
    runner: R,
    measures: M,
}

impl<R, M> LocalQualityGate<R, M>
where
    R: CommandRunner,
    M: MeasuresSource,
{
    pub fn new(config: SonarConfig, runner: R, measures: M) -> Self {
        Self {
            config,
            runner,
            measures,
        }
    }

    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&self) -> QualityResult<GateReport> {
        let tests_ran = self.run_tests().await?;
        self.check_coverage().await?;

        run_scanner_with_retry(&self.runner, &self.config).await?;
        info!(target: "auraxis::quality", "scanner finished");

        let measures = poll_ratings(
            &self.measures,
            &self.config.project_key,
            self.config.poll_attempts,
            self.config.poll_interval,
        )
        .await?;
        let ratings = evaluate_ratings(&measures, self.config.target_rating)?;

        info!(
            target: "auraxis::quality",
            project = %self.config.project_key,
            target_rating = %self.config.target_rating,
            "quality gate passed"
        );
        Ok(GateReport {
            project_key: self.config.project_key.clone(),
            tests_ran,
            ratings,
        })
    }

    async fn run_tests(&self) -> QualityResult<bool> {
        if self.config.skip_tests {
            info!(target: "auraxis::quality", "skipping test suite");
            return Ok(false);
        }

        info!(target: "auraxis::quality", command = %self.config.test_command, "running test suite");
        let output = self
            .runner
            .run(&CommandSpec::shell(&self.config.test_command))
            .await
            .map_err(|e| e.in_step(GateStep::Tests))?;
        if !output.success() {
            return Err(QualityError::TestsFailed {
                code: output.failure_code(),
            });
        }
        Ok(true)
    }

    async fn check_coverage(&self) -> QualityResult<()> {
        let path = &self.config.coverage_report;
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(QualityError::CoverageMissing { path: path.clone() }),
        }
    }
}

/// Load configuration from `env`, run the gate against SonarCloud and
/// return the process exit code. Every failure goes through [`soft_fail`].
pub async fn run_local_gate(
    env: &EnvSource,
    mode: Option<EnforcementMode>,
    skip_tests: bool,
) -> i32 {
    let mode = mode.unwrap_or_else(|| EnforcementMode::detect(env));
    info!(target: "auraxis::quality", %mode, "starting local quality gate");

    let result = async {
        let mut config = SonarConfig::from_env_source(env)?;
        if skip_tests {
            config = config.with_skip_tests(true);
        }
        let client = SonarCloudClient::from_config(&config)?;
        LocalQualityGate::new(config, SystemCommandRunner::new(), client)
            .run()
            .await
    }
    .await;

    match result {
        Ok(_) => 0,
        Err(failure) => soft_fail(mode, &failure),
    }
}
