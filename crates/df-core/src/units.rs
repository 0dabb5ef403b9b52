// df-core/src/units.rs

use uom::si::f64::{
    Force as UomForce, Length as UomLength, Mass as UomMass, MassRate as UomMassRate,
};
use uom::typenum::{N2, P1, Z0};

// Public canonical unit types (SI, f64)
pub type Force = UomForce;
pub type Length = UomLength;
pub type Mass = UomMass;

/// Viscous damping constant, N*s/m (dimensionally kg/s).
pub type Damping = UomMassRate;

/// Spring stiffness, N/m (dimensionally kg/s^2).
pub type Stiffness =
    uom::si::Quantity<uom::si::ISQ<Z0, P1, N2, Z0, Z0, Z0, Z0>, uom::si::SI<f64>, f64>;

#[inline]
pub fn kg(v: f64) -> Mass {
    use uom::si::mass::kilogram;
    Mass::new::<kilogram>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn newton(v: f64) -> Force {
    use uom::si::force::newton;
    Force::new::<newton>(v)
}

/// Damping constant from N*s/m.
#[inline]
pub fn ns_per_m(v: f64) -> Damping {
    use uom::si::mass_rate::kilogram_per_second;
    Damping::new::<kilogram_per_second>(v)
}

/// Stiffness from N/m.
#[inline]
pub fn n_per_m(v: f64) -> Stiffness {
    newton(v) / m(1.0)
}
