//! # auraxis-flags
//!
//! Feature-flag runtime for the auraxis API and the catalog hygiene check
//! run in CI.
//!
//! ## Resolution order
//!
//! 1. a value passed by the caller
//! 2. the remote provider snapshot (Unleash client API, cached for a TTL)
//! 3. `AURAXIS_FEATURE_FLAGS` JSON overrides
//! 4. the local catalog status (`active`, `released` or `enabled` means on)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use auraxis_flags::FeatureFlags;
//!
//! # async fn demo() -> Result<(), auraxis_flags::FlagError> {
//! let flags = FeatureFlags::from_env()?;
//! if flags.is_enabled("api.tools.salary-raise-calculator", None).await? {
//!     println!("calculator on");
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod hygiene;
pub mod overrides;
pub mod provider;
pub mod resolver;

pub use catalog::{FlagCatalog, FlagDefinition, ENABLED_STATUSES};
pub use config::{FlagsConfig, ProviderMode};
pub use error::{FlagError, FlagResult};
pub use hygiene::{load_catalog_entries, validate_flags, HygieneReport, ValidationIssue};
pub use overrides::parse_overrides;
pub use provider::{FlagProvider, FlagSnapshot, LocalOnlyProvider, StaticProvider, UnleashProvider};
pub use resolver::{Decision, DecisionSource, FeatureFlags};
