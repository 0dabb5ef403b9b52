//! Experiment configuration: nominal parameters, sampling, noise, solver.

use std::path::Path;

use df_core::numeric::{ensure_finite, ensure_positive};
use df_fit::{FitParams, LmConfig};
use df_sim::{OscillatorCoefficients, OscillatorState, SimOptions, TimeGrid};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Everything needed to reproduce one synthetic fit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    pub nominal: NominalParams,
    pub initial_state: OscillatorState,
    pub time: TimeConfig,
    pub noise: NoiseConfig,
    pub perturbation: Perturbation,
    /// Shared by data generation and every residual evaluation
    pub integrator: SimOptions,
    pub fit: FitConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            nominal: NominalParams::default(),
            initial_state: OscillatorState::new(0.1, 0.0),
            time: TimeConfig::default(),
            noise: NoiseConfig::default(),
            perturbation: Perturbation::default(),
            integrator: SimOptions::default(),
            fit: FitConfig::default(),
        }
    }
}

/// True coefficients used to generate the observations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NominalParams {
    /// N/m
    pub spring: f64,
    /// N*s/m
    pub damping: f64,
    /// kg
    pub mass: f64,
}

impl Default for NominalParams {
    fn default() -> Self {
        Self {
            spring: 100.0,
            damping: 3.0,
            mass: 1.0,
        }
    }
}

impl NominalParams {
    pub fn coefficients(&self) -> OscillatorCoefficients {
        OscillatorCoefficients {
            spring: self.spring,
            damping: self.damping,
            mass: self.mass,
        }
    }

    /// The nominal point in solver coordinates.
    pub fn fit_params(&self) -> FitParams {
        FitParams::from_coefficients(self.coefficients())
    }
}

/// Uniform sampling window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeConfig {
    pub start: f64,
    pub end: f64,
    pub samples: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 4.0,
            samples: 10_000,
        }
    }
}

impl TimeConfig {
    pub fn grid(&self) -> AppResult<TimeGrid> {
        Ok(TimeGrid::linspace(self.start, self.end, self.samples)?)
    }
}

/// Additive Gaussian measurement noise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NoiseConfig {
    pub std_dev: f64,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            std_dev: 0.001,
            seed: 42,
        }
    }
}

/// How the starting guess is derived from the nominal parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Perturbation {
    /// Add an independent draw from `[low, high)` to each raw coefficient.
    Uniform { low: f64, high: f64 },
    /// Add fixed offsets to the raw coefficients.
    Offset {
        spring: f64,
        damping: f64,
        inverse_mass: f64,
    },
}

impl Default for Perturbation {
    fn default() -> Self {
        Perturbation::Uniform {
            low: 0.0,
            high: 1.0,
        }
    }
}

/// Estimator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FitConfig {
    pub solver: LmConfig,
    /// Keep every raw coefficient strictly positive during the search
    pub positive_bounds: bool,
}

impl ExperimentConfig {
    /// Check every field; backend option structs validate themselves.
    pub fn validate(&self) -> AppResult<()> {
        let n = &self.nominal;
        validate_positive_finite("nominal.spring", n.spring)?;
        validate_non_negative_finite("nominal.damping", n.damping)?;
        validate_positive_finite("nominal.mass", n.mass)?;

        let s = &self.initial_state;
        validate_finite("initial_state.position", s.position)?;
        validate_finite("initial_state.velocity", s.velocity)?;

        let t = &self.time;
        validate_finite("time.start", t.start)?;
        validate_finite("time.end", t.end)?;
        if t.end <= t.start {
            return Err(invalid("time.end", t.end, "must be greater than time.start"));
        }
        if t.samples < 2 {
            return Err(invalid("time.samples", t.samples, "need at least 2 samples"));
        }

        validate_non_negative_finite("noise.std_dev", self.noise.std_dev)?;

        match self.perturbation {
            Perturbation::Uniform { low, high } => {
                validate_finite("perturbation.low", low)?;
                validate_finite("perturbation.high", high)?;
                if high < low {
                    return Err(invalid("perturbation.high", high, "must be >= low"));
                }
            }
            Perturbation::Offset {
                spring,
                damping,
                inverse_mass,
            } => {
                validate_finite("perturbation.spring", spring)?;
                validate_finite("perturbation.damping", damping)?;
                validate_finite("perturbation.inverse_mass", inverse_mass)?;
            }
        }

        self.integrator.validate()?;
        self.fit.solver.validate()?;
        Ok(())
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> AppResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// Load and validate a configuration from a YAML file.
pub fn load_yaml(path: &Path) -> AppResult<ExperimentConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    ExperimentConfig::from_yaml_str(&content)
}

/// Save a configuration to a YAML file.
pub fn save_yaml(path: &Path, config: &ExperimentConfig) -> AppResult<()> {
    let content = config.to_yaml_string()?;
    std::fs::write(path, content).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> AppError {
    AppError::Validation(format!("{} = {} ({})", field, value.to_string(), reason))
}

fn validate_finite(field: &'static str, value: f64) -> AppResult<()> {
    ensure_finite(value, field)?;
    Ok(())
}

fn validate_positive_finite(field: &'static str, value: f64) -> AppResult<()> {
    ensure_positive(value, field)?;
    Ok(())
}

fn validate_non_negative_finite(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be non-negative and finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_experiment() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.nominal.spring, 100.0);
        assert_eq!(cfg.nominal.damping, 3.0);
        assert_eq!(cfg.nominal.mass, 1.0);
        assert_eq!(cfg.initial_state, OscillatorState::new(0.1, 0.0));
        assert_eq!(cfg.time.samples, 10_000);
        assert_eq!(cfg.noise.std_dev, 0.001);
        assert!(!cfg.fit.positive_bounds);
        cfg.validate().unwrap();
    }

    #[test]
    fn yaml_round_trip_preserves_config() {
        let mut cfg = ExperimentConfig::default();
        cfg.perturbation = Perturbation::Offset {
            spring: 0.5,
            damping: 0.5,
            inverse_mass: 0.5,
        };
        cfg.fit.positive_bounds = true;

        let yaml = cfg.to_yaml_string().unwrap();
        let back = ExperimentConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let yaml = "time:\n  start: 0.0\n  end: 2.0\n  samples: 500\nnoise:\n  std_dev: 0.0\n  seed: 7\n";
        let cfg = ExperimentConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.time.samples, 500);
        assert_eq!(cfg.noise.seed, 7);
        assert_eq!(cfg.nominal, NominalParams::default());
        assert_eq!(cfg.integrator, SimOptions::default());
    }

    #[test]
    fn perturbation_is_tagged_by_type() {
        let yaml = "perturbation:\n  type: offset\n  spring: 1.0\n  damping: 0.0\n  inverse_mass: -0.1\n";
        let cfg = ExperimentConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(cfg.perturbation, Perturbation::Offset { spring, .. } if spring == 1.0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = ExperimentConfig::default();
        cfg.time.samples = 1;
        assert!(matches!(cfg.validate(), Err(AppError::Validation(_))));

        let mut cfg = ExperimentConfig::default();
        cfg.noise.std_dev = -0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = ExperimentConfig::default();
        cfg.time.end = cfg.time.start;
        assert!(cfg.validate().is_err());

        let mut cfg = ExperimentConfig::default();
        cfg.nominal.mass = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = ExperimentConfig::default();
        cfg.integrator.rtol = 0.0;
        assert!(matches!(cfg.validate(), Err(AppError::Simulation(_))));

        let mut cfg = ExperimentConfig::default();
        cfg.fit.solver.max_iterations = 0;
        assert!(matches!(cfg.validate(), Err(AppError::Fit(_))));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let path = Path::new("/nonexistent/dampfit/config.yaml");
        match load_yaml(path) {
            Err(AppError::ConfigFileRead { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected ConfigFileRead, got {:?}", other),
        }
    }
}
