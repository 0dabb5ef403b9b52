//! Residual function: simulated minus observed positions.

use df_sim::{OscillatorState, SimOptions, TimeGrid, Trajectory, simulate};
use nalgebra::DVector;

use crate::error::{FitError, FitResult};
use crate::params::FitParams;

/// Observations bound to the grid and initial state they were taken with.
///
/// The initial state and integrator options stay fixed for the lifetime of
/// the problem; only the parameters vary between evaluations.
#[derive(Clone, Debug)]
pub struct ResidualProblem {
    grid: TimeGrid,
    observed: Vec<f64>,
    initial: OscillatorState,
    sim: SimOptions,
}

impl ResidualProblem {
    /// Fails with `DimensionMismatch` before any integration when the
    /// observation count differs from the grid length.
    pub fn new(
        grid: TimeGrid,
        observed: Vec<f64>,
        initial: OscillatorState,
        sim: SimOptions,
    ) -> FitResult<Self> {
        if grid.len() != observed.len() {
            return Err(FitError::DimensionMismatch {
                grid: grid.len(),
                observed: observed.len(),
            });
        }
        sim.validate()?;
        Ok(Self {
            grid,
            observed,
            initial,
            sim,
        })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    pub fn initial_state(&self) -> OscillatorState {
        self.initial
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Integrate with `params` on the observation grid.
    pub fn simulate(&self, params: &FitParams) -> FitResult<Trajectory> {
        Ok(simulate(
            params.coefficients(),
            self.initial,
            &self.grid,
            &self.sim,
        )?)
    }

    pub fn residuals(&self, params: &FitParams) -> FitResult<DVector<f64>> {
        let traj = self.simulate(params)?;
        Ok(DVector::from_iterator(
            self.observed.len(),
            traj.states
                .iter()
                .zip(&self.observed)
                .map(|(s, y)| s.position - y),
        ))
    }

    /// 0.5 * sum of squared residuals.
    pub fn cost(&self, params: &FitParams) -> FitResult<f64> {
        Ok(0.5 * self.residuals(params)?.norm_squared())
    }
}

/// One-shot residual evaluation without building a [`ResidualProblem`].
pub fn residuals(
    params: &FitParams,
    grid: &TimeGrid,
    observed: &[f64],
    initial: OscillatorState,
    opts: &SimOptions,
) -> FitResult<DVector<f64>> {
    let problem = ResidualProblem::new(grid.clone(), observed.to_vec(), initial, opts.clone())?;
    problem.residuals(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> FitParams {
        FitParams::new(100.0, 3.0, 1.0)
    }

    #[test]
    fn mismatched_lengths_fail_before_integration() {
        let grid = TimeGrid::linspace(0.0, 4.0, 100).unwrap();
        let err = ResidualProblem::new(
            grid,
            vec![0.0; 50],
            OscillatorState::new(0.1, 0.0),
            SimOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FitError::DimensionMismatch {
                grid: 100,
                observed: 50
            }
        ));
    }

    #[test]
    fn residuals_vanish_at_generating_parameters() {
        let grid = TimeGrid::linspace(0.0, 4.0, 500).unwrap();
        let initial = OscillatorState::new(0.1, 0.0);
        let opts = SimOptions::default();
        let observed = simulate(nominal().coefficients(), initial, &grid, &opts)
            .unwrap()
            .positions();

        let r = residuals(&nominal(), &grid, &observed, initial, &opts).unwrap();
        assert_eq!(r.len(), 500);
        assert!(r.amax() < 1e-12);
    }

    #[test]
    fn residual_sign_is_simulated_minus_observed() {
        let grid = TimeGrid::linspace(0.0, 1.0, 20).unwrap();
        let initial = OscillatorState::new(0.1, 0.0);
        let problem =
            ResidualProblem::new(grid, vec![1.0; 20], initial, SimOptions::default()).unwrap();
        let r = problem.residuals(&nominal()).unwrap();
        // First sample is the initial position 0.1
        assert!((r[0] - (0.1 - 1.0)).abs() < 1e-15);
        assert!(problem.cost(&nominal()).unwrap() > 0.0);
    }

    #[test]
    fn invalid_sim_options_are_rejected() {
        let grid = TimeGrid::linspace(0.0, 1.0, 10).unwrap();
        let opts = SimOptions {
            rtol: -1.0,
            ..SimOptions::default()
        };
        let err = ResidualProblem::new(grid, vec![0.0; 10], OscillatorState::default(), opts)
            .unwrap_err();
        assert!(matches!(err, FitError::Simulation(_)));
    }
}
