mod commands;

use anyhow::Context;
use auraxis_core::{init_logging, LoggingConfig};
use auraxis_quality::EnforcementMode;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use commands::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "auraxis")]
#[command(version = auraxis_core::VERSION)]
#[command(about = "Feature-flag and quality gate tooling for the auraxis API")]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feature-flag catalog tools
    Flags {
        #[command(subcommand)]
        flags_command: FlagsCommands,
    },

    /// SonarCloud quality gate
    Sonar {
        #[command(subcommand)]
        sonar_command: SonarCommands,
    },
}

#[derive(Subcommand)]
enum FlagsCommands {
    /// Validate catalog hygiene (naming, ownership, lifecycle dates)
    Check {
        /// Catalog file (defaults to AURAXIS_FEATURE_FLAGS_CATALOG or config/feature-flags.json)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Required key prefix
        #[arg(long, default_value = auraxis_flags::hygiene::DEFAULT_KEY_PREFIX)]
        prefix: String,

        /// Evaluation date for expiry checks (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Resolve a flag the way the API does
    Eval {
        /// Flag key
        key: String,

        /// Value supplied by the calling code, wins over every other source
        #[arg(long)]
        provider_value: Option<bool>,

        /// Catalog file override
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SonarCommands {
    /// Run tests, the scanner and the rating assertions
    Check {
        /// advisory or enforce (defaults from SONAR_LOCAL_MODE, SONAR_LOCAL_ENFORCE, CI)
        #[arg(long)]
        mode: Option<EnforcementMode>,

        /// Skip the test suite and reuse the existing coverage report
        #[arg(long)]
        skip_tests: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::default()
        .with_level(cli.log_level.as_str())
        .with_json(cli.log_json);
    init_logging(&logging).context("failed to initialize logging")?;

    let code = match cli.command {
        Commands::Flags { flags_command } => match flags_command {
            FlagsCommands::Check {
                catalog,
                prefix,
                today,
            } => flags::check(catalog.as_deref(), &prefix, today),
            FlagsCommands::Eval {
                key,
                provider_value,
                catalog,
                json,
            } => flags::eval(&key, provider_value, catalog.as_deref(), json).await?,
        },
        Commands::Sonar { sonar_command } => match sonar_command {
            SonarCommands::Check { mode, skip_tests } => sonar::check(mode, skip_tests).await,
        },
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
