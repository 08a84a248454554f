use crate::QualityError;
use auraxis_core::{parse_bool_flag, EnvSource};
use std::fmt;
use std::str::FromStr;
use tracing::{error, warn};

pub const LOCAL_MODE_ENV: &str = "SONAR_LOCAL_MODE";
pub const LOCAL_ENFORCE_ENV: &str = "SONAR_LOCAL_ENFORCE";
pub const CI_ENV: &str = "CI";

/// Whether gate failures stop the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnforcementMode {
    /// Report and exit 0
    #[default]
    Advisory,
    /// Report and exit with the failure's code
    Enforce,
}

impl EnforcementMode {
    /// `SONAR_LOCAL_MODE` wins, then a truthy `SONAR_LOCAL_ENFORCE`, then a
    /// truthy `CI`. Anything else is advisory.
    pub fn detect(env: &EnvSource) -> Self {
        if let Some(mode) = env.get(LOCAL_MODE_ENV).and_then(|raw| raw.parse().ok()) {
            return mode;
        }
        let truthy = |key: &str| {
            env.get(key)
                .and_then(|raw| parse_bool_flag(&raw))
                .unwrap_or(false)
        };
        if truthy(LOCAL_ENFORCE_ENV) || truthy(CI_ENV) {
            EnforcementMode::Enforce
        } else {
            EnforcementMode::Advisory
        }
    }

    pub fn is_enforced(self) -> bool {
        self == EnforcementMode::Enforce
    }
}

impl FromStr for EnforcementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" | "warn" => Ok(EnforcementMode::Advisory),
            "enforce" | "strict" => Ok(EnforcementMode::Enforce),
            other => Err(format!("unknown gate mode '{}'", other)),
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnforcementMode::Advisory => f.write_str("advisory"),
            EnforcementMode::Enforce => f.write_str("enforce"),
        }
    }
}

/// Report a failure and pick the process exit code for `mode`.
pub fn soft_fail(mode: EnforcementMode, failure: &QualityError) -> i32 {
    let step = failure.step();
    match mode {
        EnforcementMode::Advisory => {
            warn!(
                target: "auraxis::quality",
                %step,
                error = %failure,
                "quality gate failed (advisory mode, not blocking)"
            );
            0
        }
        EnforcementMode::Enforce => {
            let code = failure.exit_code();
            error!(target: "auraxis::quality", %step, error = %failure, code, "quality gate failed");
            code
        }
    }
}
