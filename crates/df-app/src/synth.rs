//! Synthetic observations: measurement noise and perturbed starting guesses.

use df_fit::FitParams;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::Perturbation;
use crate::error::{AppError, AppResult};

/// Add independent zero-mean Gaussian noise to each sample.
pub fn add_noise<R: Rng>(signal: &[f64], std_dev: f64, rng: &mut R) -> AppResult<Vec<f64>> {
    if std_dev == 0.0 {
        return Ok(signal.to_vec());
    }
    let normal = Normal::new(0.0, std_dev)
        .map_err(|e| AppError::Validation(format!("noise std_dev = {}: {}", std_dev, e)))?;
    Ok(signal.iter().map(|y| y + normal.sample(rng)).collect())
}

/// Starting guess for the estimator, in solver coordinates.
pub fn perturb_guess<R: Rng>(
    nominal: FitParams,
    perturbation: &Perturbation,
    rng: &mut R,
) -> FitParams {
    match *perturbation {
        Perturbation::Uniform { low, high } => {
            let mut draw = || {
                if high > low {
                    rng.gen_range(low..high)
                } else {
                    low
                }
            };
            // Draw order follows the parameter order
            let spring = nominal.spring + draw();
            let damping = nominal.damping + draw();
            let inverse_mass = nominal.inverse_mass + draw();
            FitParams::new(spring, damping, inverse_mass)
        }
        Perturbation::Offset {
            spring,
            damping,
            inverse_mass,
        } => FitParams::new(
            nominal.spring + spring,
            nominal.damping + damping,
            nominal.inverse_mass + inverse_mass,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_noise_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let signal = vec![0.1, 0.05, -0.02];
        assert_eq!(add_noise(&signal, 0.0, &mut rng).unwrap(), signal);
    }

    #[test]
    fn noise_statistics_follow_std_dev() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let noisy = add_noise(&vec![0.0; n], 0.001, &mut rng).unwrap();

        let mean = noisy.iter().sum::<f64>() / n as f64;
        let var = noisy.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        assert!(mean.abs() < 5e-5, "mean = {mean}");
        assert!((var.sqrt() - 0.001).abs() < 5e-5, "sd = {}", var.sqrt());
    }

    #[test]
    fn same_seed_gives_same_noise() {
        let signal = vec![0.0; 100];
        let a = add_noise(&signal, 0.01, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = add_noise(&signal, 0.01, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn offset_perturbation_is_exact() {
        let mut rng = StdRng::seed_from_u64(0);
        let guess = perturb_guess(
            FitParams::new(100.0, 3.0, 1.0),
            &Perturbation::Offset {
                spring: 0.5,
                damping: 0.5,
                inverse_mass: 0.5,
            },
            &mut rng,
        );
        assert_eq!(guess, FitParams::new(100.5, 3.5, 1.5));
    }

    #[test]
    fn degenerate_uniform_range_adds_low() {
        let mut rng = StdRng::seed_from_u64(0);
        let guess = perturb_guess(
            FitParams::new(100.0, 3.0, 1.0),
            &Perturbation::Uniform {
                low: 0.25,
                high: 0.25,
            },
            &mut rng,
        );
        assert_eq!(guess, FitParams::new(100.25, 3.25, 1.25));
    }

    proptest! {
        #[test]
        fn uniform_perturbation_stays_in_range(
            seed in any::<u64>(),
            low in -1.0_f64..1.0,
            width in 0.01_f64..2.0,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let nominal = FitParams::new(100.0, 3.0, 1.0);
            let range = Perturbation::Uniform { low, high: low + width };
            let g = perturb_guess(nominal, &range, &mut rng);
            for (x, x0) in [(g.spring, 100.0), (g.damping, 3.0), (g.inverse_mass, 1.0)] {
                let d = x - x0;
                // Addition to x0 rounds, so allow a few ulps at the edges
                prop_assert!(d >= low - 1e-12 && d < low + width + 1e-12);
            }
        }
    }
}
