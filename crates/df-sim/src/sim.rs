//! Grid runner and result recording.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{SimError, SimResult};
use crate::grid::TimeGrid;
use crate::integrator::{DormandPrince, ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4) with rtol/atol error control (default).
    #[default]
    DormandPrince,
    /// 4th-order Runge-Kutta, fixed sub-steps per grid interval.
    #[serde(rename = "rk4")]
    RK4,
    /// Forward Euler (1st-order, 1 rhs call per step).
    ForwardEuler,
}

/// Options for simulation runs.
///
/// Data generation and residual evaluation must share one `SimOptions`
/// value; mixing tolerances biases the fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Integrator type (default: Dormand-Prince)
    pub integrator: IntegratorType,
    /// Relative local error tolerance (adaptive only)
    pub rtol: f64,
    /// Absolute local error tolerance (adaptive only)
    pub atol: f64,
    /// First trial step; defaults to the first grid interval
    pub initial_dt: Option<f64>,
    /// Upper bound on any internal step (seconds)
    pub max_dt: Option<f64>,
    /// Adaptive step floor; shrinking below it is an error
    pub min_dt: f64,
    /// Maximum number of step attempts per run (safety limit)
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            integrator: IntegratorType::default(),
            rtol: 1e-9,
            atol: 1e-12,
            initial_dt: None,
            max_dt: None,
            min_dt: 1e-14,
            max_steps: 5_000_000,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.rtol > 0.0) || !(self.atol > 0.0) {
            return Err(SimError::InvalidArg {
                what: "rtol and atol must be positive",
            });
        }
        if let Some(dt) = self.initial_dt {
            if !(dt > 0.0) {
                return Err(SimError::InvalidArg {
                    what: "initial_dt must be positive",
                });
            }
        }
        if let Some(dt) = self.max_dt {
            if !(dt > 0.0) {
                return Err(SimError::InvalidArg {
                    what: "max_dt must be positive",
                });
            }
        }
        if !(self.min_dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "min_dt must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        Ok(())
    }
}

/// Record of simulation results, one entry per grid timestamp.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
}

impl<S> SimRecord<S> {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Integrate `model` from its initial state and sample it at every grid
/// timestamp. The first record is the initial state at `grid.start()`.
///
/// Non-finite states are not trapped: they are accepted and carried through
/// the remaining samples.
pub fn run_on_grid<M: TransientModel>(
    model: &M,
    grid: &TimeGrid,
    opts: &SimOptions,
) -> SimResult<SimRecord<M::State>> {
    opts.validate()?;

    let states = match opts.integrator {
        IntegratorType::DormandPrince => run_adaptive(model, grid, opts)?,
        IntegratorType::RK4 => run_fixed(&RK4, model, grid, opts)?,
        IntegratorType::ForwardEuler => run_fixed(&ForwardEuler, model, grid, opts)?,
    };

    Ok(SimRecord {
        t: grid.samples().to_vec(),
        x: states,
    })
}

fn run_fixed<I: Integrator, M: TransientModel>(
    integrator: &I,
    model: &M,
    grid: &TimeGrid,
    opts: &SimOptions,
) -> SimResult<Vec<M::State>> {
    let mut x = model.initial_state();
    let mut states = Vec::with_capacity(grid.len());
    states.push(x.clone());

    let mut steps = 0;
    for w in grid.samples().windows(2) {
        let interval = w[1] - w[0];
        let substeps = match opts.max_dt {
            Some(max_dt) => (interval / max_dt).ceil().max(1.0) as usize,
            None => 1,
        };
        let dt = interval / substeps as f64;

        for i in 0..substeps {
            steps += 1;
            if steps > opts.max_steps {
                return Err(SimError::StepLimit {
                    max_steps: opts.max_steps,
                    t: w[0] + i as f64 * dt,
                });
            }
            x = integrator.step(model, w[0] + i as f64 * dt, &x, dt)?;
        }
        states.push(x.clone());
    }

    Ok(states)
}

fn run_adaptive<M: TransientModel>(
    model: &M,
    grid: &TimeGrid,
    opts: &SimOptions,
) -> SimResult<Vec<M::State>> {
    let samples = grid.samples();
    let stepper = DormandPrince;

    let mut x = model.initial_state();
    let mut states = Vec::with_capacity(samples.len());
    states.push(x.clone());

    let mut h = opts.initial_dt.unwrap_or(samples[1] - samples[0]);
    let mut attempts = 0;
    let mut rejected = 0;

    for w in samples.windows(2) {
        let (mut t, t_out) = (w[0], w[1]);

        while t < t_out {
            let remaining = t_out - t;
            let mut dt = h.min(remaining);
            if let Some(max_dt) = opts.max_dt {
                dt = dt.min(max_dt);
            }
            let lands = dt >= remaining;

            attempts += 1;
            if attempts > opts.max_steps {
                return Err(SimError::StepLimit {
                    max_steps: opts.max_steps,
                    t,
                });
            }

            let attempt = stepper.attempt(model, t, &x, dt)?;
            let magnitude = model.max_abs(&x).max(model.max_abs(&attempt.x_new));
            let err = model.max_abs(&attempt.error) / (opts.atol + opts.rtol * magnitude);

            if err <= 1.0 || !err.is_finite() {
                // Non-finite estimates are accepted so divergence propagates
                t = if lands { t_out } else { t + dt };
                x = attempt.x_new;
                h = if err.is_finite() { dt * growth(err) } else { dt };
            } else {
                rejected += 1;
                h = dt * (SAFETY * err.powf(-0.2)).max(MIN_FACTOR);
                if h < opts.min_dt {
                    return Err(SimError::StepSizeUnderflow { t, dt: h });
                }
            }
        }
        states.push(x.clone());
    }

    trace!(attempts, rejected, "adaptive integration finished");
    Ok(states)
}

fn growth(err: f64) -> f64 {
    if err == 0.0 {
        MAX_FACTOR
    } else {
        (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
    }
}
