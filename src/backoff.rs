//! Exponential backoff schedule for retry delays.
//!
//! Retry semantics: retry index `0` represents the initial call (no delay),
//! and retries start at `1`. The delay for the Nth retry is
//! `initial × 2^(N−1)`, capped at the configured maximum. The cap is applied
//! to the base delay before any jitter, so jittered values may exceed it by
//! the jitter factor.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use backstop::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_millis(250))
//!     .unwrap();
//! assert_eq!(backoff.delay(0), Duration::ZERO); // initial call
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay(3), Duration::from_millis(250)); // capped
//! ```
//!
//! Overflow behavior: computations that would overflow saturate to
//! `MAX_BACKOFF` (1 day). Retry indices greater than `u32::MAX` are clamped
//! when computing multipliers.

use std::fmt;
use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Default base delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(5000);

/// Default upper bound on any computed (pre-jitter) delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffError {
    /// The cap must be greater than zero.
    MaxMustBePositive,
    /// The cap must not be smaller than the base delay.
    MaxLessThanInitial {
        /// Configured base delay.
        initial: Duration,
        /// Rejected cap.
        max: Duration,
    },
}

impl fmt::Display for BackoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffError::MaxMustBePositive => write!(f, "max must be greater than zero"),
            BackoffError::MaxLessThanInitial { initial, max } => {
                write!(f, "max ({:?}) must be >= initial ({:?})", max, initial)
            }
        }
    }
}

impl std::error::Error for BackoffError {}

/// Exponential backoff schedule with a cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    /// Create an exponential schedule starting at `initial`, capped only by
    /// [`MAX_BACKOFF`] until [`with_max`](Self::with_max) is applied.
    pub fn exponential(initial: Duration) -> Self {
        Self { initial, max: MAX_BACKOFF }
    }

    /// Set the cap on computed delays. Returns an error if `max` is zero or
    /// smaller than the base delay.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        if max < self.initial {
            return Err(BackoffError::MaxLessThanInitial { initial: self.initial, max });
        }
        self.max = max;
        Ok(self)
    }

    /// Delay for the given retry index (0 = initial call, no delay).
    pub fn delay(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = retry.saturating_sub(1).min(u32::MAX as usize) as u32;
        let multiplier = 2u128.saturating_pow(exponent);
        let nanos = self.initial.as_nanos().saturating_mul(multiplier);
        let uncapped = Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64);
        uncapped.min(self.max)
    }
}

impl Default for Backoff {
    /// 5 s base doubling up to a 30 s cap.
    fn default() -> Self {
        Self { initial: DEFAULT_INITIAL_DELAY, max: DEFAULT_MAX_DELAY }
    }
}
