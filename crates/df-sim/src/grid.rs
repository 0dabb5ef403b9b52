//! Output time grids.

use df_core::{Tolerances, nearly_equal};

use crate::error::{SimError, SimResult};

/// Strictly increasing, finite output timestamps (at least two).
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    samples: Vec<f64>,
}

impl TimeGrid {
    /// `n` evenly spaced samples from `start` to `end` inclusive.
    pub fn linspace(start: f64, end: f64, n: usize) -> SimResult<Self> {
        if n < 2 {
            return Err(SimError::InvalidArg {
                what: "time grid needs at least two samples",
            });
        }
        if !start.is_finite() || !end.is_finite() {
            return Err(SimError::InvalidArg {
                what: "time grid bounds must be finite",
            });
        }
        if end <= start {
            return Err(SimError::InvalidArg {
                what: "time grid end must be after start",
            });
        }

        let span = end - start;
        let last = (n - 1) as f64;
        let mut samples: Vec<f64> = (0..n).map(|i| start + span * (i as f64 / last)).collect();
        samples[n - 1] = end;

        Self::from_samples(samples)
    }

    pub fn from_samples(samples: Vec<f64>) -> SimResult<Self> {
        if samples.len() < 2 {
            return Err(SimError::InvalidArg {
                what: "time grid needs at least two samples",
            });
        }
        if samples.iter().any(|t| !t.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "time grid samples must be finite",
            });
        }
        if samples.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimError::InvalidArg {
                what: "time grid must be strictly increasing",
            });
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.samples[0]
    }

    pub fn end(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    /// True when every interval matches the first one within `tol`.
    pub fn is_uniform(&self, tol: Tolerances) -> bool {
        let first = self.samples[1] - self.samples[0];
        self.samples
            .windows(2)
            .all(|w| nearly_equal(w[1] - w[0], first, tol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn linspace_hits_both_ends() {
        let grid = TimeGrid::linspace(0.0, 4.0, 10_000).unwrap();
        assert_eq!(grid.len(), 10_000);
        assert_eq!(grid.start(), 0.0);
        assert_eq!(grid.end(), 4.0);
        assert!(grid.is_uniform(Tolerances {
            abs: 1e-12,
            rel: 1e-9
        }));
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(TimeGrid::linspace(0.0, 1.0, 1).is_err());
        assert!(TimeGrid::linspace(1.0, 1.0, 10).is_err());
        assert!(TimeGrid::linspace(0.0, f64::NAN, 10).is_err());
        assert!(TimeGrid::from_samples(vec![0.0, 0.5, 0.5, 1.0]).is_err());
        assert!(TimeGrid::from_samples(vec![0.0, 2.0, 1.0]).is_err());
    }

    #[test]
    fn irregular_grid_is_not_uniform() {
        let grid = TimeGrid::from_samples(vec![0.0, 0.1, 0.3, 0.4]).unwrap();
        assert!(!grid.is_uniform(Tolerances::default()));
    }

    proptest! {
        #[test]
        fn linspace_is_strictly_increasing(
            start in -100.0_f64..100.0,
            span in 1e-3_f64..1e3,
            n in 2_usize..2000,
        ) {
            let grid = TimeGrid::linspace(start, start + span, n).unwrap();
            prop_assert_eq!(grid.len(), n);
            prop_assert!(grid.samples().windows(2).all(|w| w[1] > w[0]));
        }
    }
}
