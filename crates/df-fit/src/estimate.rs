//! Parameter estimation entry point.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::FitResult;
use crate::lm::{Bounds, LmConfig, Termination, levenberg_marquardt};
use crate::params::{FitParams, PhysicalEstimate};
use crate::residual::ResidualProblem;

/// Result of fitting a [`ResidualProblem`].
#[derive(Clone, Debug, Serialize)]
pub struct FitOutcome {
    /// Best raw parameters found
    pub params: FitParams,
    /// Starting point handed to the optimizer
    pub initial_guess: FitParams,
    /// 0.5 * sum of squared residuals at `params`
    pub cost: f64,
    /// Root mean square residual at `params`
    pub rms: f64,
    pub iterations: usize,
    /// Residual evaluations, i.e. full integrations
    pub evaluations: usize,
    pub termination: Termination,
    /// Converged flag; `false` means `params` is the best point reached
    pub success: bool,
}

impl FitOutcome {
    pub fn physical(&self) -> FitResult<PhysicalEstimate> {
        PhysicalEstimate::from_fit(&self.params)
    }
}

/// Fit the oscillator parameters to `problem`, starting from `guess`.
///
/// Non-convergence is not an error: the outcome carries `success = false`
/// and the best point reached.
pub fn estimate(
    problem: &ResidualProblem,
    guess: FitParams,
    config: &LmConfig,
    bounds: Option<&Bounds>,
) -> FitResult<FitOutcome> {
    let report = levenberg_marquardt(
        guess.to_vector(),
        |x| problem.residuals(&FitParams::from_vector(x)?),
        bounds,
        config,
    )?;

    let params = FitParams::from_vector(&report.x)?;
    let rms = if problem.is_empty() {
        0.0
    } else {
        (2.0 * report.cost / problem.len() as f64).sqrt()
    };

    if report.success {
        info!(
            iterations = report.iterations,
            evaluations = report.evaluations,
            cost = report.cost,
            termination = %report.termination,
            "fit converged"
        );
    } else {
        warn!(
            iterations = report.iterations,
            cost = report.cost,
            termination = %report.termination,
            "fit did not converge"
        );
    }

    Ok(FitOutcome {
        params,
        initial_guess: guess,
        cost: report.cost,
        rms,
        iterations: report.iterations,
        evaluations: report.evaluations,
        termination: report.termination,
        success: report.success,
    })
}
