//! Fitted parameter triple and the physical constants derived from it.

use df_core::units::{Damping, Mass, Stiffness, kg, n_per_m, ns_per_m};
use df_sim::OscillatorCoefficients;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, FitResult};

/// Raw parameters seen by the optimizer, in solver order.
///
/// `inverse_mass` is the channel the equation of motion divides by. The
/// physical mass is its reciprocal; see [`PhysicalEstimate::from_fit`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub spring: f64,
    pub damping: f64,
    pub inverse_mass: f64,
}

impl FitParams {
    pub const LEN: usize = 3;

    pub fn new(spring: f64, damping: f64, inverse_mass: f64) -> Self {
        Self {
            spring,
            damping,
            inverse_mass,
        }
    }

    /// Raw triple taken straight from equation coefficients.
    pub fn from_coefficients(c: OscillatorCoefficients) -> Self {
        Self::new(c.spring, c.damping, c.mass)
    }

    /// Coefficients handed to the integrator.
    pub fn coefficients(&self) -> OscillatorCoefficients {
        OscillatorCoefficients {
            spring: self.spring,
            damping: self.damping,
            mass: self.inverse_mass,
        }
    }

    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.spring, self.damping, self.inverse_mass])
    }

    pub fn from_vector(x: &DVector<f64>) -> FitResult<Self> {
        if x.len() != Self::LEN {
            return Err(FitError::InvalidConfig {
                what: format!("expected {} parameters, got {}", Self::LEN, x.len()),
            });
        }
        Ok(Self::new(x[0], x[1], x[2]))
    }

    pub fn is_finite(&self) -> bool {
        self.spring.is_finite() && self.damping.is_finite() && self.inverse_mass.is_finite()
    }
}

/// Physical constants recovered from a fitted triple.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhysicalEstimate {
    /// kg
    pub mass: f64,
    /// N/m
    pub spring: f64,
    /// N*s/m
    pub damping: f64,
}

impl PhysicalEstimate {
    /// `mass = 1 / inverse_mass`, then spring and damping are scaled by it.
    pub fn from_fit(params: &FitParams) -> FitResult<Self> {
        if params.inverse_mass == 0.0 || !params.inverse_mass.is_finite() {
            return Err(FitError::NonPhysical {
                what: format!(
                    "inverse_mass = {} has no finite reciprocal",
                    params.inverse_mass
                ),
            });
        }
        let mass = 1.0 / params.inverse_mass;
        Ok(Self {
            mass,
            spring: params.spring * mass,
            damping: params.damping * mass,
        })
    }

    pub fn mass_quantity(&self) -> Mass {
        kg(self.mass)
    }

    pub fn spring_quantity(&self) -> Stiffness {
        n_per_m(self.spring)
    }

    pub fn damping_quantity(&self) -> Damping {
        ns_per_m(self.damping)
    }
}
