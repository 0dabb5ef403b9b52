//! Error types for fitting operations.

use df_core::error::DfError;
use df_sim::SimError;
use thiserror::Error;

/// Errors that can occur while setting up or running a fit.
#[derive(Error, Debug)]
pub enum FitError {
    #[error(
        "Dimension mismatch: time grid has {grid} samples but {observed} observations were given"
    )]
    DimensionMismatch { grid: usize, observed: usize },

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Non-physical estimate: {what}")]
    NonPhysical { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
}

pub type FitResult<T> = Result<T, FitError>;

impl From<DfError> for FitError {
    fn from(e: DfError) -> Self {
        FitError::InvalidConfig {
            what: e.to_string(),
        }
    }
}
