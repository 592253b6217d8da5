//! Scalar distributions used to randomize per-particle properties at
//! emission: initial speed, decay rate, and similar fields can
//! each be drawn from a fixed value, a uniform range, or a truncated normal.

use crate::error::{MeshError, Result};
use rand::Rng;

/// Maximum number of rejection attempts before a truncated distribution
/// gives up and reports [`MeshError::DistributionUnsatisfiable`].
pub const MAX_REJECTION_ATTEMPTS: usize = 1_000;

/// A scalar distribution an emitter samples from per particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Always the same value.
    Fixed(f64),
    /// Uniform over `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// Normal(`mean`, `std_dev`), rejection-sampled to `[low, high)`.
    TruncatedNormal { mean: f64, std_dev: f64, low: f64, high: f64 },
}

impl Distribution {
    /// Draw one sample using `rng`, rejection-sampling at most `max_attempts`
    /// times for `TruncatedNormal`.
    ///
    /// `TruncatedNormal` rejects draws outside the half-open interval
    /// `[low, high)` and retries, failing with
    /// [`MeshError::DistributionUnsatisfiable`] if the bounds are too tight
    /// relative to the spread to be satisfied within that budget (e.g. bounds
    /// many standard deviations from the mean).
    pub fn sample(&self, rng: &mut impl Rng, max_attempts: usize) -> Result<f64> {
        match *self {
            Distribution::Fixed(v) => Ok(v),
            Distribution::Uniform { low, high } => Ok(rng.gen_range(low..=high)),
            Distribution::TruncatedNormal { mean, std_dev, low, high } => {
                for _ in 0..max_attempts {
                    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                    let u2: f64 = rng.gen_range(0.0..1.0);
                    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                    let candidate = mean + std_dev * z;
                    if candidate >= low && candidate < high {
                        return Ok(candidate);
                    }
                }
                Err(MeshError::DistributionUnsatisfiable { attempts: max_attempts })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn fixed_always_returns_same_value() {
        let d = Distribution::Fixed(4.2);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(d.sample(&mut rng, MAX_REJECTION_ATTEMPTS).unwrap(), 4.2);
    }

    #[test]
    fn uniform_stays_within_bounds() {
        let d = Distribution::Uniform { low: 1.0, high: 2.0 };
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let v = d.sample(&mut rng, MAX_REJECTION_ATTEMPTS).unwrap();
            assert!((1.0..=2.0).contains(&v));
        }
    }

    #[test]
    fn truncated_normal_stays_within_half_open_bounds() {
        let d = Distribution::TruncatedNormal { mean: 0.0, std_dev: 1.0, low: -0.5, high: 0.5 };
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            let v = d.sample(&mut rng, MAX_REJECTION_ATTEMPTS).unwrap();
            assert!(v >= -0.5 && v < 0.5);
        }
    }

    #[test]
    fn impossible_bounds_report_unsatisfiable() {
        let d = Distribution::TruncatedNormal { mean: 0.0, std_dev: 1.0, low: 1000.0, high: 1001.0 };
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            d.sample(&mut rng, MAX_REJECTION_ATTEMPTS),
            Err(MeshError::DistributionUnsatisfiable { attempts: MAX_REJECTION_ATTEMPTS })
        );
    }

    #[test]
    fn caller_supplied_cap_is_reported_on_failure() {
        let d = Distribution::TruncatedNormal { mean: 0.0, std_dev: 1.0, low: 1000.0, high: 1001.0 };
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(
            d.sample(&mut rng, 5),
            Err(MeshError::DistributionUnsatisfiable { attempts: 5 })
        );
    }
}
