//! Error types for the df-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// provides a single error interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("Fit error: {0}")]
    Fit(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for df-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<df_fit::FitError> for AppError {
    fn from(err: df_fit::FitError) -> Self {
        AppError::Fit(err.to_string())
    }
}

impl From<df_sim::SimError> for AppError {
    fn from(err: df_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<df_core::DfError> for AppError {
    fn from(err: df_core::DfError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
