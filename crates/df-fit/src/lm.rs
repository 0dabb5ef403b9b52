//! Levenberg-Marquardt least-squares solver.
//!
//! Minimises `cost = 0.5 * |r(x)|^2`. Each iteration takes the thin SVD of
//! the finite difference Jacobian `J = U S V^T` and tries the damped step
//!
//! ```text
//! dx = -sum_i  s_i / (s_i^2 + lambda) * (u_i . r) * v_i
//! ```
//!
//! over the singular values with `s_i > rcond * s_max`. Dropping the tiny
//! ones keeps the step out of directions the data cannot resolve, so a
//! rank-deficient problem moves to the nearest minimiser instead of
//! drifting along its null space.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FitError, FitResult};
use crate::jacobian::{DifferenceScheme, central_difference_jacobian, finite_difference_jacobian};

/// Levenberg-Marquardt configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum outer iterations (Jacobian evaluations)
    pub max_iterations: usize,
    /// Stop when an accepted step lowers the cost by less than `ftol * cost`
    pub ftol: f64,
    /// Stop when `|dx| <= xtol * (xtol + |x|)`
    pub xtol: f64,
    /// Stop when the largest gradient component `|J^T r|` is at most `gtol`
    pub gtol: f64,
    /// Initial damping, relative to the largest squared singular value
    pub initial_lambda: f64,
    /// Damping multiplier after a rejected step
    pub lambda_increase: f64,
    /// Damping divisor after an accepted step
    pub lambda_decrease: f64,
    /// Give up once damping exceeds this, relative to the largest squared singular value
    pub max_lambda: f64,
    /// Relative cutoff for singular values used in the step
    pub rcond: f64,
    /// Finite difference formula for the Jacobian
    pub jacobian: DifferenceScheme,
    /// Relative finite difference step
    pub jacobian_epsilon: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_increase: 2.0,
            lambda_decrease: 3.0,
            max_lambda: 1e16,
            rcond: 1e-7,
            jacobian: DifferenceScheme::Central,
            jacobian_epsilon: 6e-6,
        }
    }
}

impl LmConfig {
    pub fn validate(&self) -> FitResult<()> {
        let invalid = |what: &str| {
            Err(FitError::InvalidConfig {
                what: what.to_string(),
            })
        };
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive");
        }
        for (name, value) in [
            ("ftol", self.ftol),
            ("xtol", self.xtol),
            ("gtol", self.gtol),
        ] {
            if !(value >= 0.0) {
                return invalid(&format!("{name} must be non-negative"));
            }
        }
        if !(self.initial_lambda > 0.0) || !(self.max_lambda > self.initial_lambda) {
            return invalid("need 0 < initial_lambda < max_lambda");
        }
        if !(self.lambda_increase > 1.0) || !(self.lambda_decrease > 1.0) {
            return invalid("lambda_increase and lambda_decrease must exceed 1");
        }
        if !(self.rcond > 0.0 && self.rcond < 1.0) {
            return invalid("rcond must lie in (0, 1)");
        }
        if !(self.jacobian_epsilon > 0.0) {
            return invalid("jacobian_epsilon must be positive");
        }
        Ok(())
    }
}

/// Box constraints applied by projecting every trial point.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl Bounds {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> FitResult<Self> {
        if lower.len() != upper.len() {
            return Err(FitError::InvalidConfig {
                what: format!(
                    "bounds length mismatch: lower {} vs upper {}",
                    lower.len(),
                    upper.len()
                ),
            });
        }
        if lower.iter().zip(upper.iter()).any(|(lo, hi)| !(lo <= hi)) {
            return Err(FitError::InvalidConfig {
                what: "every lower bound must be <= its upper bound".to_string(),
            });
        }
        Ok(Self { lower, upper })
    }

    /// Strictly positive lower bound `floor`, no upper bound.
    pub fn positive(n: usize, floor: f64) -> Self {
        Self {
            lower: DVector::from_element(n, floor),
            upper: DVector::from_element(n, f64::INFINITY),
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn project(&self, x: &mut DVector<f64>) {
        for i in 0..x.len() {
            x[i] = x[i].clamp(self.lower[i], self.upper[i]);
        }
    }

    pub fn contains(&self, x: &DVector<f64>) -> bool {
        x.iter()
            .enumerate()
            .all(|(i, v)| *v >= self.lower[i] && *v <= self.upper[i])
    }
}

/// Why the solver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Relative cost reduction fell below `ftol`.
    CostTolerance,
    /// Step length fell below `xtol`.
    StepTolerance,
    /// Gradient fell below `gtol` (includes an exact fit).
    GradientTolerance,
    /// `max_iterations` reached.
    MaxIterations,
    /// No acceptable step before damping reached `max_lambda`.
    LambdaOverflow,
    /// Residuals could not be evaluated around the current point.
    EvaluationFailure,
}

impl Termination {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Termination::CostTolerance | Termination::StepTolerance | Termination::GradientTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::CostTolerance => "cost reduction below ftol",
            Termination::StepTolerance => "step size below xtol",
            Termination::GradientTolerance => "gradient below gtol",
            Termination::MaxIterations => "maximum iterations reached",
            Termination::LambdaOverflow => "damping overflow, no downhill step found",
            Termination::EvaluationFailure => "residual evaluation failed near the current point",
        };
        f.write_str(text)
    }
}

/// Levenberg-Marquardt result.
#[derive(Clone, Debug)]
pub struct LmReport {
    /// Final parameter vector
    pub x: DVector<f64>,
    /// Residuals at `x`
    pub residuals: DVector<f64>,
    /// 0.5 * |r|^2 at `x`
    pub cost: f64,
    /// Number of outer iterations
    pub iterations: usize,
    /// Number of residual evaluations, Jacobian columns included
    pub evaluations: usize,
    pub termination: Termination,
    /// Converged flag
    pub success: bool,
}

fn half_squared_norm(r: &DVector<f64>) -> f64 {
    0.5 * r.norm_squared()
}

/// Minimise `0.5 * |residual_fn(x)|^2` from `x0`.
///
/// A failing evaluation at `x0` is returned as an error. Failing trial
/// points are treated like uphill steps. Non-convergence is reported through
/// `success`, not as an error.
pub fn levenberg_marquardt<F>(
    x0: DVector<f64>,
    residual_fn: F,
    bounds: Option<&Bounds>,
    config: &LmConfig,
) -> FitResult<LmReport>
where
    F: Fn(&DVector<f64>) -> FitResult<DVector<f64>> + Sync,
{
    config.validate()?;

    let n = x0.len();
    let mut x = x0;
    if let Some(b) = bounds {
        if b.len() != n {
            return Err(FitError::InvalidConfig {
                what: format!("bounds cover {} parameters, expected {}", b.len(), n),
            });
        }
        b.project(&mut x);
    }

    let mut r = residual_fn(&x)?;
    let mut cost = half_squared_norm(&r);
    let mut evaluations = 1;
    if !cost.is_finite() {
        return Err(FitError::Numeric {
            what: "non-finite cost at the initial guess".to_string(),
        });
    }

    let mut lambda: Option<f64> = None;

    for iter in 0..config.max_iterations {
        if cost == 0.0 {
            return Ok(finish(x, r, cost, iter, evaluations, Termination::GradientTolerance));
        }

        // Past the initial guess a failing stencil ends the fit at the best point
        evaluations += config.jacobian.evaluations(n);
        let jac = match jacobian(&x, &r, &residual_fn, config) {
            Ok(jac) if jac.iter().all(|v| v.is_finite()) => jac,
            Ok(_) if iter == 0 => {
                return Err(FitError::Numeric {
                    what: "non-finite Jacobian at the initial guess".to_string(),
                });
            }
            Err(e) if iter == 0 => return Err(e),
            outcome => {
                if let Err(e) = outcome {
                    warn!(iteration = iter, error = %e, "Jacobian evaluation failed");
                } else {
                    warn!(iteration = iter, "non-finite Jacobian");
                }
                return Ok(finish(x, r, cost, iter, evaluations, Termination::EvaluationFailure));
            }
        };

        let gradient = jac.tr_mul(&r);
        if gradient.amax() <= config.gtol {
            return Ok(finish(x, r, cost, iter, evaluations, Termination::GradientTolerance));
        }

        let svd = jac.svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                return Err(FitError::Numeric {
                    what: "SVD of the Jacobian failed".to_string(),
                });
            }
        };
        let sigma = svd.singular_values;
        let sigma_max = sigma.max();
        let projected = u.tr_mul(&r);

        let lam = lambda.get_or_insert(config.initial_lambda * sigma_max * sigma_max);
        let lambda_ceiling = config.max_lambda * sigma_max * sigma_max;

        // Inner loop: raise damping until a step goes downhill
        let mut trial_failed = false;
        let mut trial_evaluated = false;
        loop {
            let mut step = DVector::zeros(n);
            for i in 0..sigma.len() {
                let s = sigma[i];
                if s > config.rcond * sigma_max {
                    step -= v_t.row(i).transpose() * (s / (s * s + *lam) * projected[i]);
                }
            }

            if step.norm() <= config.xtol * (config.xtol + x.norm()) {
                // A vanishing step counts as convergence only if some trial was evaluated
                let termination = if trial_failed && !trial_evaluated {
                    Termination::EvaluationFailure
                } else {
                    Termination::StepTolerance
                };
                return Ok(finish(x, r, cost, iter, evaluations, termination));
            }

            let mut x_new = &x + &step;
            if let Some(b) = bounds {
                b.project(&mut x_new);
            }

            evaluations += 1;
            let trial = match residual_fn(&x_new) {
                Ok(r_new) => {
                    let cost_new = half_squared_norm(&r_new);
                    trial_evaluated |= cost_new.is_finite();
                    trial_failed |= !cost_new.is_finite();
                    (cost_new.is_finite() && cost_new < cost).then_some((r_new, cost_new))
                }
                Err(e) => {
                    debug!(iteration = iter, error = %e, "trial evaluation failed");
                    trial_failed = true;
                    None
                }
            };

            if let Some((r_new, cost_new)) = trial {
                let reduction = cost - cost_new;
                let old_cost = cost;
                x = x_new;
                r = r_new;
                cost = cost_new;
                *lam /= config.lambda_decrease;

                debug!(
                    iteration = iter,
                    cost,
                    lambda = *lam,
                    step = step.norm(),
                    "accepted step"
                );

                if reduction <= config.ftol * old_cost {
                    return Ok(finish(
                        x,
                        r,
                        cost,
                        iter + 1,
                        evaluations,
                        Termination::CostTolerance,
                    ));
                }
                break;
            }

            *lam *= config.lambda_increase;
            if *lam > lambda_ceiling {
                return Ok(finish(x, r, cost, iter, evaluations, Termination::LambdaOverflow));
            }
        }
    }

    Ok(finish(
        x,
        r,
        cost,
        config.max_iterations,
        evaluations,
        Termination::MaxIterations,
    ))
}

fn finish(
    x: DVector<f64>,
    residuals: DVector<f64>,
    cost: f64,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
) -> LmReport {
    LmReport {
        x,
        residuals,
        cost,
        iterations,
        evaluations,
        termination,
        success: termination.is_success(),
    }
}

fn jacobian<F>(
    x: &DVector<f64>,
    r: &DVector<f64>,
    residual_fn: &F,
    config: &LmConfig,
) -> FitResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> FitResult<DVector<f64>> + Sync,
{
    match config.jacobian {
        DifferenceScheme::Forward => {
            finite_difference_jacobian(x, r, residual_fn, config.jacobian_epsilon)
        }
        DifferenceScheme::Central => {
            central_difference_jacobian(x, residual_fn, config.jacobian_epsilon)
        }
    }
}
