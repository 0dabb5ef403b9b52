//! Transient simulation for the damped oscillator.
//!
//! Provides:
//! - Pluggable `TransientModel` trait for first-order ODE systems
//! - Fixed-step RK4 / forward Euler and adaptive Dormand-Prince 5(4)
//! - Grid runner that reports the state exactly at each requested timestamp
//! - Linear damped oscillator model

pub mod error;
pub mod grid;
pub mod integrator;
pub mod model;
pub mod oscillator;
pub mod sim;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use grid::TimeGrid;
pub use integrator::{DormandPrince, ForwardEuler, Integrator, RK4, StepAttempt};
pub use model::TransientModel;
pub use oscillator::{
    DampedOscillator, OscillatorCoefficients, OscillatorState, Trajectory, extremum_amplitudes,
    mechanical_energy, simulate, state_derivative,
};
pub use sim::{IntegratorType, SimOptions, SimRecord, run_on_grid};
