pub mod config;
pub mod errors;
pub mod logging;

pub use config::{
    parse_bool_flag, parse_count, parse_positive_duration, parse_positive_seconds, AppConfigTrait,
    ConfigError, ConfigSource, EnvSource,
};
pub use errors::CoreError;
pub use logging::{init_logging, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tooling name used in log targets and user agents
pub const TOOL_NAME: &str = "auraxis";

/// Get tooling version
pub fn version() -> &'static str {
    VERSION
}

/// `name/version` string for outbound HTTP requests
pub fn user_agent() -> String {
    format!("{}/{}", TOOL_NAME, VERSION)
}
