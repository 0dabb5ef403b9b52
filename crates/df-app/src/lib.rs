//! Application service layer for dampfit.
//!
//! Wires the simulator and estimator into a reproducible synthetic
//! experiment: configuration, noisy data generation, the fit itself, and a
//! report the CLI can print or export.

pub mod config;
pub mod error;
pub mod experiment;
pub mod report;
pub mod synth;

// Re-export key types for convenience
pub use config::{
    ExperimentConfig, FitConfig, NoiseConfig, NominalParams, Perturbation, TimeConfig, load_yaml,
    save_yaml,
};
pub use error::{AppError, AppResult};
pub use experiment::{run_experiment, simulate_nominal};
pub use report::{ExperimentReport, ExperimentTiming, ReportSeries};
pub use synth::{add_noise, perturb_guess};
