//! Finite difference Jacobian computation.
//!
//! Columns are independent residual evaluations and are computed in
//! parallel; the result does not depend on scheduling.

use crate::error::{FitError, FitResult};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Finite difference formula used for Jacobian columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceScheme {
    /// One extra evaluation per parameter.
    Forward,
    /// Two extra evaluations per parameter, second-order accurate.
    #[default]
    Central,
}

impl DifferenceScheme {
    /// Residual evaluations needed for one Jacobian with `n` parameters.
    pub fn evaluations(self, n: usize) -> usize {
        match self {
            DifferenceScheme::Forward => n,
            DifferenceScheme::Central => 2 * n,
        }
    }
}

/// Compute Jacobian using forward finite differences.
///
/// For each column j, perturbs x[j] by epsilon and computes (f(x+e) - f(x))/epsilon.
/// `f_x` is the already-known value f(x).
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> FitResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> FitResult<DVector<f64>> + Sync,
{
    ensure_columns(x)?;

    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| -> FitResult<DVector<f64>> {
            let dx = epsilon * x[j].abs().max(1.0);
            let mut x_perturbed = x.clone();
            x_perturbed[j] += dx;

            let f_perturbed = f(&x_perturbed)?;
            Ok((f_perturbed - f_x) / dx)
        })
        .collect::<FitResult<Vec<DVector<f64>>>>()?;

    Ok(DMatrix::from_columns(&columns))
}

/// Compute Jacobian using central finite differences (more accurate but 2x cost).
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> FitResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> FitResult<DVector<f64>> + Sync,
{
    ensure_columns(x)?;

    let columns = (0..x.len())
        .into_par_iter()
        .map(|j| -> FitResult<DVector<f64>> {
            let dx = epsilon * x[j].abs().max(1.0);

            let mut x_plus = x.clone();
            x_plus[j] += dx;
            let f_plus = f(&x_plus)?;

            let mut x_minus = x.clone();
            x_minus[j] -= dx;
            let f_minus = f(&x_minus)?;

            Ok((f_plus - f_minus) / (2.0 * dx))
        })
        .collect::<FitResult<Vec<DVector<f64>>>>()?;

    Ok(DMatrix::from_columns(&columns))
}

fn ensure_columns(x: &DVector<f64>) -> FitResult<()> {
    if x.is_empty() {
        return Err(FitError::InvalidConfig {
            what: "Jacobian needs at least one parameter".to_string(),
        });
    }
    Ok(())
}
