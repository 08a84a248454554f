//! # auraxis-quality
//!
//! Local SonarCloud quality gate. Runs the test suite with coverage, the
//! scanner (retrying while another analysis holds the project lock) and then
//! asserts that the reliability, security and maintainability ratings all
//! reach the target grade.
//!
//! Failures are reported through [`soft_fail`]: advisory mode only warns,
//! enforce mode (CI, or an explicit override) returns the failure's exit code.

pub mod config;
pub mod error;
pub mod gate;
pub mod measures;
pub mod mode;
pub mod runner;
pub mod scanner;

pub use config::{normalize_env_value, SonarConfig};
pub use error::{GateStep, QualityError, QualityResult};
pub use gate::{run_local_gate, GateReport, LocalQualityGate};
pub use measures::{
    evaluate_ratings, poll_ratings, Measure, MeasuresSource, Rating, SonarCloudClient,
    RATING_METRICS,
};
pub use mode::{soft_fail, EnforcementMode};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use scanner::{is_lock_contention, run_scanner_with_retry, scanner_command};
