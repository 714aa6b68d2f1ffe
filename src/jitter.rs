//! Jitter strategies to prevent thundering herd.
//!
//! The retry schedule applies multiplicative jitter: the base delay is scaled
//! by a factor drawn uniformly from a band around 1.0 (default `[0.7, 1.3]`).
//! Growth stays predictable and bounded while concurrent retriers
//! desynchronize. Because the backoff cap is applied to the base delay,
//! jittered values can reach `high × max_delay`.
//!
//! Notes:
//! - RNG: uses `rand`'s thread-local RNG by default; deterministic RNGs can
//!   be injected via `apply_with_rng`.
//! - Precision: jitter is computed in whole milliseconds; extremely large
//!   durations saturate instead of panicking.
//! - `Jitter::None` is the identity, for tests and tightly controlled
//!   workflows.

use rand::{rng, Rng};
use std::time::Duration;

/// Lower edge of the default jitter band.
pub const DEFAULT_JITTER_LOW: f64 = 0.7;

/// Upper edge of the default jitter band.
pub const DEFAULT_JITTER_HIGH: f64 = 1.3;

/// Jitter strategy for randomizing retry delays.
#[derive(Debug, Clone, PartialEq)]
pub enum Jitter {
    /// No jitter - use exact backoff delay.
    None,
    /// Scale the delay by a factor drawn uniformly from `[low, high]`.
    Multiplicative {
        /// Lower bound of the scaling factor.
        low: f64,
        /// Upper bound of the scaling factor.
        high: f64,
    },
}

impl Jitter {
    /// Multiplicative jitter over the default `[0.7, 1.3]` band.
    pub fn multiplicative() -> Self {
        Jitter::Multiplicative { low: DEFAULT_JITTER_LOW, high: DEFAULT_JITTER_HIGH }
    }

    /// Multiplicative jitter over a custom band.
    pub fn band(low: f64, high: f64) -> Result<Self, &'static str> {
        if !low.is_finite() || !high.is_finite() {
            return Err("jitter band: bounds must be finite");
        }
        if low < 0.0 {
            return Err("jitter band: low must not be negative");
        }
        if low > high {
            return Err("jitter band: low must not exceed high");
        }
        Ok(Jitter::Multiplicative { low, high })
    }

    /// Apply jitter to a delay duration.
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_internal(delay, &mut rng)
    }

    /// Apply jitter with a custom RNG (for deterministic tests).
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        self.apply_internal(delay, rng)
    }

    fn as_millis_saturated(duration: Duration) -> u64 {
        duration.as_millis().try_into().unwrap_or(u64::MAX)
    }

    fn apply_internal<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        match *self {
            Jitter::None => delay,
            Jitter::Multiplicative { low, high } => {
                let millis = Self::as_millis_saturated(delay);
                if millis == 0 {
                    return Duration::ZERO;
                }
                let factor = rng.random_range(low..=high);
                // `as` saturates the f64 -> u64 cast, so huge products clamp
                // rather than wrap.
                let jittered = (millis as f64 * factor).round() as u64;
                Duration::from_millis(jittered)
            }
        }
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Jitter::multiplicative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn none_jitter_returns_exact_delay() {
        let jitter = Jitter::None;
        let delay = Duration::from_secs(1);
        assert_eq!(jitter.apply(delay), delay);
    }

    #[test]
    fn multiplicative_stays_within_band() {
        let jitter = Jitter::multiplicative();
        let delay = Duration::from_millis(1000);

        for _ in 0..100 {
            let jittered = jitter.apply(delay);
            assert!(jittered >= Duration::from_millis(700));
            assert!(jittered <= Duration::from_millis(1300));
        }
    }

    #[test]
    fn repeated_applications_are_not_constant() {
        let jitter = Jitter::multiplicative();
        let delay = Duration::from_secs(1);

        let samples: std::collections::HashSet<Duration> =
            (0..32).map(|_| jitter.apply(delay)).collect();
        assert!(samples.len() > 1, "jitter should vary across applications");
    }

    #[test]
    fn deterministic_rng_stays_within_band() {
        let jitter = Jitter::multiplicative();
        let delay = Duration::from_millis(200);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let jittered = jitter.apply_with_rng(delay, &mut rng);
            assert!(jittered >= Duration::from_millis(140));
            assert!(jittered <= Duration::from_millis(260));
        }
    }

    #[test]
    fn different_seeds_produce_different_sequences() {
        let jitter = Jitter::multiplicative();
        let delay = Duration::from_secs(1);

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let seq_a: Vec<Duration> = (0..16).map(|_| jitter.apply_with_rng(delay, &mut rng_a)).collect();
        let seq_b: Vec<Duration> = (0..16).map(|_| jitter.apply_with_rng(delay, &mut rng_b)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn custom_band_is_respected() {
        let jitter = Jitter::band(0.5, 2.0).unwrap();
        let delay = Duration::from_millis(100);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let jittered = jitter.apply_with_rng(delay, &mut rng);
            assert!(jittered >= Duration::from_millis(50));
            assert!(jittered <= Duration::from_millis(200));
        }
    }

    #[test]
    fn invalid_bands_are_rejected() {
        assert!(Jitter::band(1.3, 0.7).is_err());
        assert!(Jitter::band(-0.1, 1.0).is_err());
        assert!(Jitter::band(0.5, f64::NAN).is_err());
        assert!(Jitter::band(0.5, f64::INFINITY).is_err());
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(Jitter::multiplicative().apply(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn saturates_large_durations_without_panicking() {
        let huge = Duration::from_millis(u64::MAX);
        let jitter = Jitter::multiplicative();
        let mut rng = StdRng::seed_from_u64(999);

        // Must not panic; the f64 cast clamps.
        let _ = jitter.apply_with_rng(huge, &mut rng);
    }
}
