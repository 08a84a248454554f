use std::path::PathBuf;
use thiserror::Error;

/// Feature-flag errors
#[derive(Error, Debug)]
pub enum FlagError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Catalog(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Config(#[from] auraxis_core::ConfigError),
}

impl FlagError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }
}

/// Result type for flag operations
pub type FlagResult<T> = Result<T, FlagError>;
