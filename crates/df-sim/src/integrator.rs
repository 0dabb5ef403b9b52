//! Single-step time integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // Combine: x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        let k_sum = model.add(
            &model.add(&k1, &model.scale(&k2, 2.0)),
            &model.add(&model.scale(&k3, 2.0), &k4),
        );

        Ok(model.add(x, &model.scale(&k_sum, dt / 6.0)))
    }
}

/// Forward Euler (explicit, 1st order, fast for testing).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

/// Result of one embedded Runge-Kutta step.
#[derive(Clone, Debug)]
pub struct StepAttempt<S> {
    /// 5th-order solution at t + dt.
    pub x_new: S,
    /// Difference between the 5th- and 4th-order solutions.
    pub error: S,
}

/// Dormand-Prince 5(4) embedded pair.
///
/// `attempt` returns the propagated state together with the local error
/// estimate; step acceptance and step-size control live in the grid runner.
#[derive(Clone, Debug)]
pub struct DormandPrince;

const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [&[f64]; 7] = [
    &[],
    &[1.0 / 5.0],
    &[3.0 / 40.0, 9.0 / 40.0],
    &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
    &[
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
    ],
    &[
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
    ],
    // 7th stage evaluates at the 5th-order solution
    &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// b - b* (5th-order weights minus embedded 4th-order weights).
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

impl DormandPrince {
    pub fn attempt<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<StepAttempt<M::State>> {
        let mut k: Vec<M::State> = Vec::with_capacity(7);
        k.push(model.rhs(t, x)?);

        let mut x_new = x.clone();
        for stage in 1..7 {
            let xs = model.add(x, &weighted_sum(model, dt, A[stage], &k));
            k.push(model.rhs(t + C[stage] * dt, &xs)?);
            if stage == 6 {
                x_new = xs;
            }
        }

        let error = weighted_sum(model, dt, &E, &k);
        Ok(StepAttempt { x_new, error })
    }
}

impl Integrator for DormandPrince {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        Ok(self.attempt(model, t, x, dt)?.x_new)
    }
}

/// dt * sum(coef[i] * k[i]) over the leading `coef.len()` stages.
fn weighted_sum<M: TransientModel>(
    model: &M,
    dt: f64,
    coef: &[f64],
    k: &[M::State],
) -> M::State {
    let mut acc = model.scale(&k[0], coef[0] * dt);
    for (c, ki) in coef.iter().zip(k).skip(1) {
        if *c != 0.0 {
            acc = model.add(&acc, &model.scale(ki, c * dt));
        }
    }
    acc
}
