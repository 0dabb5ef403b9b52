//! TransientModel trait for pluggable dynamic systems.

use crate::error::SimResult;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Vector-space arithmetic for integration: add states, scale by scalar
/// - A max-norm used by adaptive error control
///
/// Models are borrowed immutably so one model can be integrated from several
/// threads at once; a call to `rhs` must not depend on earlier calls.
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the initial state at the first grid timestamp.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    fn rhs(&self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// Largest absolute component of `a`. Must be NaN when any component is NaN.
    fn max_abs(&self, a: &Self::State) -> f64;
}
