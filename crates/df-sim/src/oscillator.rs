//! Linear damped harmonic oscillator, m*p'' + c*p' + k*p = 0.
//!
//! Written as the first-order system
//!
//! ```text
//! dp/dt = v
//! dv/dt = -(k/m)*p - (c/m)*v
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::grid::TimeGrid;
use crate::model::TransientModel;
use crate::sim::{SimOptions, SimRecord, run_on_grid};

/// Oscillator state: index 0 is position, index 1 is velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OscillatorState {
    /// Position (m)
    pub position: f64,
    /// Velocity (m/s)
    pub velocity: f64,
}

impl OscillatorState {
    pub fn new(position: f64, velocity: f64) -> Self {
        Self { position, velocity }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.position, self.velocity]
    }
}

impl From<[f64; 2]> for OscillatorState {
    fn from(v: [f64; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

/// Coefficients of the governing equation.
///
/// No sign checks are made here: the fitter may probe zero or negative
/// values, and the resulting non-finite or growing trajectories are left to
/// propagate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorCoefficients {
    /// Spring constant k (N/m)
    pub spring: f64,
    /// Damping constant c (N*s/m)
    pub damping: f64,
    /// Mass m (kg)
    pub mass: f64,
}

/// Time derivative of `state`. Pure arithmetic; `mass == 0` yields
/// non-finite components.
pub fn state_derivative(
    state: &OscillatorState,
    spring: f64,
    damping: f64,
    mass: f64,
) -> OscillatorState {
    OscillatorState {
        position: state.velocity,
        velocity: -spring / mass * state.position - damping / mass * state.velocity,
    }
}

/// Kinetic plus potential energy (J).
pub fn mechanical_energy(state: &OscillatorState, spring: f64, mass: f64) -> f64 {
    0.5 * mass * state.velocity * state.velocity + 0.5 * spring * state.position * state.position
}

/// Oscillator model with a fixed initial condition.
#[derive(Clone, Debug)]
pub struct DampedOscillator {
    pub coefficients: OscillatorCoefficients,
    pub initial: OscillatorState,
}

impl DampedOscillator {
    pub fn new(coefficients: OscillatorCoefficients, initial: OscillatorState) -> Self {
        Self {
            coefficients,
            initial,
        }
    }
}

impl TransientModel for DampedOscillator {
    type State = OscillatorState;

    fn initial_state(&self) -> Self::State {
        self.initial
    }

    fn rhs(&self, _t: f64, x: &Self::State) -> SimResult<Self::State> {
        let c = &self.coefficients;
        Ok(state_derivative(x, c.spring, c.damping, c.mass))
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        OscillatorState {
            position: a.position + b.position,
            velocity: a.velocity + b.velocity,
        }
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        OscillatorState {
            position: a.position * scale,
            velocity: a.velocity * scale,
        }
    }

    fn max_abs(&self, a: &Self::State) -> f64 {
        if a.position.is_nan() || a.velocity.is_nan() {
            return f64::NAN;
        }
        a.position.abs().max(a.velocity.abs())
    }
}

/// Oscillator states sampled on a time grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: Vec<OscillatorState>,
}

impl Trajectory {
    pub fn positions(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.position).collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl From<SimRecord<OscillatorState>> for Trajectory {
    fn from(record: SimRecord<OscillatorState>) -> Self {
        Self {
            times: record.t,
            states: record.x,
        }
    }
}

/// Integrate the oscillator from `initial` and sample it on `grid`.
///
/// Stateless: each call builds its own model, so repeated calls with
/// different coefficients never interact.
pub fn simulate(
    coefficients: OscillatorCoefficients,
    initial: OscillatorState,
    grid: &TimeGrid,
    opts: &SimOptions,
) -> SimResult<Trajectory> {
    let model = DampedOscillator::new(coefficients, initial);
    Ok(run_on_grid(&model, grid, opts)?.into())
}

/// Magnitudes of the interior local extrema of a sampled signal, in order.
pub fn extremum_amplitudes(signal: &[f64]) -> Vec<f64> {
    signal
        .windows(3)
        .filter(|w| (w[1] > w[0] && w[1] >= w[2]) || (w[1] < w[0] && w[1] <= w[2]))
        .map(|w| w[1].abs())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derivative_matches_equation() {
        let d = state_derivative(&OscillatorState::new(0.1, -0.5), 100.0, 3.0, 2.0);
        assert_eq!(d.position, -0.5);
        assert!((d.velocity - (-50.0 * 0.1 + 1.5 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn zero_mass_is_not_trapped() {
        let d = state_derivative(&OscillatorState::new(0.1, 0.0), 100.0, 3.0, 0.0);
        assert!(!d.velocity.is_finite());
    }

    #[test]
    fn max_abs_propagates_nan() {
        let model = DampedOscillator::new(
            OscillatorCoefficients {
                spring: 1.0,
                damping: 0.0,
                mass: 1.0,
            },
            OscillatorState::default(),
        );
        assert!(model.max_abs(&OscillatorState::new(f64::NAN, 1.0)).is_nan());
        assert_eq!(model.max_abs(&OscillatorState::new(-3.0, 1.0)), 3.0);
    }

    #[test]
    fn state_array_order_is_position_velocity() {
        let s = OscillatorState::from([0.1, 0.2]);
        assert_eq!(s.position, 0.1);
        assert_eq!(s.to_array(), [0.1, 0.2]);
    }

    #[test]
    fn extrema_of_cosine() {
        let signal: Vec<f64> = (0..400).map(|i| (i as f64 * 0.05).cos()).collect();
        let peaks = extremum_amplitudes(&signal);
        assert!(peaks.len() >= 5);
        assert!(peaks.iter().all(|a| (a - 1.0).abs() < 1e-2));
    }

    proptest! {
        #[test]
        fn zero_velocity_derivative(
            p in -10.0_f64..10.0,
            spring in 1e-3_f64..1e3,
            damping in 1e-3_f64..1e2,
            mass in 1e-2_f64..1e2,
        ) {
            let d = state_derivative(&OscillatorState::new(p, 0.0), spring, damping, mass);
            prop_assert_eq!(d.position, 0.0);
            prop_assert_eq!(d.velocity, -spring / mass * p);
        }
    }
}
