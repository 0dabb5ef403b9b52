//! Integration test: end-to-end synthetic experiments.
//!
//! Runs the reference experiment (10000 samples over [0, 4] s, noise sd
//! 0.001) and checks the derived constants, the report series and the
//! reproducibility guarantees of the seeded configuration.

use df_app::{AppError, ExperimentConfig, Perturbation, run_experiment, simulate_nominal};
use df_core::numeric::relative_error;
use df_sim::OscillatorState;

fn small_config(samples: usize) -> ExperimentConfig {
    let mut cfg = ExperimentConfig::default();
    cfg.time.samples = samples;
    cfg
}

#[test]
fn reference_experiment_recovers_physical_constants() {
    let cfg = ExperimentConfig::default();
    let report = run_experiment(&cfg).expect("experiment should run");

    assert!(report.converged(), "termination: {}", report.fit.termination);
    let p = report.physical;
    assert!(relative_error(p.spring, 100.0) < 0.01, "spring = {}", p.spring);
    assert!(relative_error(p.damping, 3.0) < 0.01, "damping = {}", p.damping);
    assert!(relative_error(p.mass, 1.0) < 0.02, "mass = {}", p.mass);

    // Residual scatter is the injected noise
    assert!(relative_error(report.fit.rms, 0.001) < 0.1, "rms = {}", report.fit.rms);

    assert_eq!(report.series.len(), 10_000);
    assert_eq!(report.series.time[0], 0.0);
    assert_eq!(report.series.time[9_999], 4.0);
    for i in [0, 1234, 9_999] {
        let s = &report.series;
        assert_eq!(s.error[i], s.observed[i] - s.fitted[i]);
    }
}

#[test]
fn noise_free_offset_guess_recovers_raw_coefficients() {
    let mut cfg = small_config(2000);
    cfg.noise.std_dev = 0.0;
    cfg.perturbation = Perturbation::Offset {
        spring: 0.5,
        damping: 0.5,
        inverse_mass: 0.5,
    };

    let report = run_experiment(&cfg).unwrap();
    let x = report.fit.params;
    assert!(report.converged());
    assert_eq!(report.fit.initial_guess.spring, 100.5);
    assert!(relative_error(x.spring, 100.0) < 0.01);
    assert!(relative_error(x.damping, 3.0) < 0.01);
    assert!(relative_error(x.inverse_mass, 1.0) < 0.01);
    assert!(report.series.max_abs_error() < 1e-6);
}

#[test]
fn same_seed_reproduces_the_report() {
    let cfg = small_config(800);
    let a = run_experiment(&cfg).unwrap();
    let b = run_experiment(&cfg).unwrap();

    assert_eq!(a.series.observed, b.series.observed);
    assert_eq!(a.fit.initial_guess, b.fit.initial_guess);
    assert_eq!(a.fit.params, b.fit.params);
}

#[test]
fn different_seed_changes_data_and_guess() {
    let cfg = small_config(800);
    let mut other = cfg.clone();
    other.noise.seed = cfg.noise.seed + 1;

    let a = run_experiment(&cfg).unwrap();
    let b = run_experiment(&other).unwrap();
    assert_ne!(a.series.observed, b.series.observed);
    assert_ne!(a.fit.initial_guess, b.fit.initial_guess);
}

#[test]
fn positive_bounds_keep_coefficients_positive() {
    let mut cfg = small_config(800);
    cfg.fit.positive_bounds = true;

    let report = run_experiment(&cfg).unwrap();
    let x = report.fit.params;
    assert!(report.converged());
    assert!(x.spring > 0.0 && x.damping > 0.0 && x.inverse_mass > 0.0);
    assert!(relative_error(report.physical.spring, 100.0) < 0.01);
}

#[test]
fn csv_and_json_exports() {
    let report = run_experiment(&small_config(200)).unwrap();

    let mut buf = Vec::new();
    report.write_csv(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("time,observed,fitted,error"));
    assert_eq!(lines.count(), 200);

    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["physical"]["mass"].is_f64());
    assert_eq!(value["fit"]["success"], serde_json::Value::Bool(true));
    assert_eq!(value["series"]["time"].as_array().map(Vec::len), Some(200));
}

#[test]
fn invalid_config_fails_before_running() {
    let mut cfg = ExperimentConfig::default();
    cfg.time.samples = 0;
    assert!(matches!(run_experiment(&cfg), Err(AppError::Validation(_))));
}

#[test]
fn nominal_trajectory_starts_at_initial_state() {
    let traj = simulate_nominal(&small_config(100)).unwrap();
    assert_eq!(traj.len(), 100);
    assert_eq!(traj.states[0], OscillatorState::new(0.1, 0.0));
    assert_eq!(traj.times[99], 4.0);
}
