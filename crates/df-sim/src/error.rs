//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Step size underflow at t = {t}: dt = {dt:e}")]
    StepSizeUnderflow { t: f64, dt: f64 },

    #[error("Step limit of {max_steps} reached at t = {t}")]
    StepLimit { max_steps: usize, t: f64 },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<df_core::error::DfError> for SimError {
    fn from(e: df_core::error::DfError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
