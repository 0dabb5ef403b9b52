//! df-core: stable foundation for dampfit.
//!
//! Contains:
//! - units (uom SI types + constructors for oscillator quantities)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{DfError, DfResult};
pub use numeric::*;
pub use units::*;
