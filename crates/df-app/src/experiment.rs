//! Synthetic fit experiment: generate, perturb, estimate, derive.

use std::time::Instant;

use df_fit::{Bounds, FitParams, ResidualProblem, estimate};
use df_sim::{Trajectory, simulate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::ExperimentConfig;
use crate::error::AppResult;
use crate::report::{ExperimentReport, ExperimentTiming, ReportSeries};
use crate::synth::{add_noise, perturb_guess};

/// Smallest value a raw coefficient may take when positive bounds are on.
const POSITIVE_FLOOR: f64 = 1e-12;

/// Noise-free trajectory of the nominal oscillator on the configured grid.
pub fn simulate_nominal(config: &ExperimentConfig) -> AppResult<Trajectory> {
    config.validate()?;
    let grid = config.time.grid()?;
    Ok(simulate(
        config.nominal.coefficients(),
        config.initial_state,
        &grid,
        &config.integrator,
    )?)
}

/// Run one experiment end to end.
///
/// Noise is drawn before the starting guess, both from one `StdRng` seeded
/// with `noise.seed`, so a config always reproduces the same report.
pub fn run_experiment(config: &ExperimentConfig) -> AppResult<ExperimentReport> {
    let total = Instant::now();
    config.validate()?;

    let grid = config.time.grid()?;
    let truth = simulate(
        config.nominal.coefficients(),
        config.initial_state,
        &grid,
        &config.integrator,
    )?;

    let mut rng = StdRng::seed_from_u64(config.noise.seed);
    let observed = add_noise(&truth.positions(), config.noise.std_dev, &mut rng)?;
    let nominal = config.nominal.fit_params();
    let guess = perturb_guess(nominal, &config.perturbation, &mut rng);
    let generate_s = total.elapsed().as_secs_f64();

    info!(
        samples = grid.len(),
        noise = config.noise.std_dev,
        spring = guess.spring,
        damping = guess.damping,
        inverse_mass = guess.inverse_mass,
        "starting fit"
    );

    let problem = ResidualProblem::new(
        grid,
        observed,
        config.initial_state,
        config.integrator.clone(),
    )?;
    let bounds = config
        .fit
        .positive_bounds
        .then(|| Bounds::positive(FitParams::LEN, POSITIVE_FLOOR));

    let fit_start = Instant::now();
    let outcome = estimate(&problem, guess, &config.fit.solver, bounds.as_ref())?;
    let fit_s = fit_start.elapsed().as_secs_f64();

    if !outcome.success {
        warn!(
            termination = %outcome.termination,
            "reporting best parameters from an unconverged fit"
        );
    }

    let physical = outcome.physical()?;
    let fitted = problem.simulate(&outcome.params)?.positions();
    let series = ReportSeries::new(
        problem.grid().samples().to_vec(),
        problem.observed().to_vec(),
        fitted,
    )?;

    info!(
        mass = physical.mass,
        spring = physical.spring,
        damping = physical.damping,
        fit_s,
        "experiment finished"
    );

    Ok(ExperimentReport {
        config: config.clone(),
        nominal,
        fit: outcome,
        physical,
        series,
        timing: ExperimentTiming {
            generate_s,
            fit_s,
            total_s: total.elapsed().as_secs_f64(),
        },
    })
}
