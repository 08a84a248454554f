use auraxis_core::ConfigError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline step a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    Environment,
    Tests,
    Scanner,
    QualityGate,
}

impl fmt::Display for GateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateStep::Environment => "environment",
            GateStep::Tests => "tests",
            GateStep::Scanner => "scanner",
            GateStep::QualityGate => "quality-gate",
        };
        f.write_str(name)
    }
}

/// Quality gate errors
#[derive(Error, Debug)]
pub enum QualityError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        /// Set by the pipeline once it knows which step was launching
        step: Option<GateStep>,
        #[source]
        source: std::io::Error,
    },

    #[error("test suite failed with exit code {code}")]
    TestsFailed { code: i32 },

    #[error("coverage report {} was not produced", path.display())]
    CoverageMissing { path: PathBuf },

    #[error("scanner failed with exit code {code} after {attempts} attempt(s)")]
    ScannerFailed { code: i32, attempts: u32 },

    #[error("another analysis is still in progress after {attempts} attempt(s)")]
    ScannerLocked { code: i32, attempts: u32 },

    #[error("measures API error: {0}")]
    Api(String),

    #[error("quality ratings below target: {}", .0.join("; "))]
    RatingsBelowTarget(Vec<String>),
}

impl QualityError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    /// Attribute a launch failure to `step`; other errors pass through.
    pub fn in_step(self, step: GateStep) -> Self {
        match self {
            Self::Spawn {
                program,
                step: None,
                source,
            } => Self::Spawn {
                program,
                step: Some(step),
                source,
            },
            other => other,
        }
    }

    /// Process exit code used when the failure is enforced
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Spawn { .. } => 127,
            Self::TestsFailed { code }
            | Self::ScannerFailed { code, .. }
            | Self::ScannerLocked { code, .. } => {
                if *code == 0 {
                    1
                } else {
                    *code
                }
            }
            Self::CoverageMissing { .. } | Self::Api(_) | Self::RatingsBelowTarget(_) => 1,
        }
    }

    pub fn step(&self) -> GateStep {
        match self {
            Self::Config(_) => GateStep::Environment,
            Self::TestsFailed { .. } | Self::CoverageMissing { .. } => GateStep::Tests,
            Self::Spawn { step, .. } => step.unwrap_or(GateStep::Scanner),
            Self::ScannerFailed { .. } | Self::ScannerLocked { .. } => GateStep::Scanner,
            Self::Api(_) | Self::RatingsBelowTarget(_) => GateStep::QualityGate,
        }
    }
}

impl From<reqwest::Error> for QualityError {
    fn from(error: reqwest::Error) -> Self {
        Self::Api(error.to_string())
    }
}

pub type QualityResult<T> = Result<T, QualityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_failure_kind() {
        assert_eq!(
            QualityError::from(ConfigError::missing_required("SONAR_TOKEN", "")).exit_code(),
            2
        );
        assert_eq!(QualityError::TestsFailed { code: 5 }.exit_code(), 5);
        assert_eq!(QualityError::ScannerFailed { code: 0, attempts: 1 }.exit_code(), 1);
        assert_eq!(
            QualityError::RatingsBelowTarget(vec!["security_rating=B".into()]).exit_code(),
            1
        );
    }

    #[test]
    fn test_steps() {
        assert_eq!(QualityError::TestsFailed { code: 1 }.step(), GateStep::Tests);
        assert_eq!(
            QualityError::ScannerLocked { code: 1, attempts: 3 }.step(),
            GateStep::Scanner
        );
        assert_eq!(QualityError::api("timeout").step(), GateStep::QualityGate);
        assert_eq!(GateStep::QualityGate.to_string(), "quality-gate");
    }

    #[test]
    fn test_launch_failure_takes_the_step_it_happened_in() {
        let launch = || QualityError::Spawn {
            program: "sh".to_string(),
            step: None,
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(launch().in_step(GateStep::Tests).step(), GateStep::Tests);
        assert_eq!(launch().in_step(GateStep::Scanner).step(), GateStep::Scanner);
        assert_eq!(
            launch()
                .in_step(GateStep::Tests)
                .in_step(GateStep::Scanner)
                .step(),
            GateStep::Tests
        );
        assert_eq!(launch().in_step(GateStep::Tests).exit_code(), 127);
        assert!(matches!(
            QualityError::TestsFailed { code: 2 }.in_step(GateStep::Scanner),
            QualityError::TestsFailed { code: 2 }
        ));
    }

    #[test]
    fn test_ratings_message_joins_mismatches() {
        let error = QualityError::RatingsBelowTarget(vec![
            "security_rating is B (expected A)".to_string(),
            "sqale_rating missing".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "quality ratings below target: security_rating is B (expected A); sqale_rating missing"
        );
    }
}
