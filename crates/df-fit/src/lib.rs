//! Parameter estimation for the damped oscillator.
//!
//! This crate fits (spring, damping, inverse_mass) to observed positions with
//! a Levenberg-Marquardt least-squares solver. Every residual evaluation
//! re-integrates the oscillator on the observation grid; the Jacobian is
//! built from finite differences of those integrations.

pub mod error;
pub mod estimate;
pub mod jacobian;
pub mod lm;
pub mod params;
pub mod residual;

pub use error::{FitError, FitResult};
pub use estimate::{FitOutcome, estimate};
pub use jacobian::{DifferenceScheme, central_difference_jacobian, finite_difference_jacobian};
pub use lm::{Bounds, LmConfig, LmReport, Termination, levenberg_marquardt};
pub use params::{FitParams, PhysicalEstimate};
pub use residual::{ResidualProblem, residuals};
