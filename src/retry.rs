//! Retry policy with rate-limit escalation.
//!
//! Semantics:
//! - `max_attempts` counts total attempts (initial try + retries).
//! - `should_retry` decides whether a failure is retryable at all;
//!   non-retryable errors propagate after the one consumed attempt.
//! - `rate_limited` decides, separately, whether a failure advances the
//!   consecutive rate-limit counter. Two consecutive rate-limit failures make
//!   the policy offer escalation (once per invocation, and only when the
//!   auth mode permits it). An accepted offer resets the retry budget and
//!   retries immediately, with no backoff for that cycle.
//! - When the budget is exhausted, the error from the last attempt is
//!   returned verbatim so callers can inspect its original classification.
//! - Backoff computes the base delay per retry; jitter randomizes it.
//!   Sleeper controls how delays are applied (production uses `TokioSleeper`;
//!   tests inject `InstantSleeper`/`TrackingSleeper`).
//!
//! Invariants:
//! - Attempts are strictly sequential; the loop holds no shared state, so
//!   concurrent invocations are fully independent.
//! - The escalation hook is invoked at most once per invocation.
//! - The consecutive rate-limit counter resets on any non-rate-limit failure
//!   and after an accepted escalation.
//! - Dropping the returned future cancels the invocation; no further
//!   attempts are scheduled.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use backstop::{Backoff, ErrorStatus, Jitter, RetryPolicy};
//!
//! #[derive(Debug)]
//! struct ApiError(u16);
//! impl std::fmt::Display for ApiError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "status {}", self.0)
//!     }
//! }
//! impl std::error::Error for ApiError {}
//! impl ErrorStatus for ApiError {
//!     fn status(&self) -> Option<u16> {
//!         Some(self.0)
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::<ApiError>::builder()
//!     .max_attempts(3)
//!     .backoff(Backoff::exponential(Duration::from_millis(100)))
//!     .with_jitter(Jitter::multiplicative())
//!     .build()
//!     .unwrap();
//! let result = policy.execute(|| async { Ok::<_, ApiError>(42) }).await;
//! assert_eq!(result.unwrap(), 42);
//! # });
//! ```

use crate::classify::{default_rate_limited, default_should_retry, ErrorStatus};
use crate::escalate::{AuthMode, Escalation};
use crate::{Backoff, Jitter, Sleeper, TokioSleeper};
use std::future::Future;
use std::sync::Arc;

/// Default total attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Consecutive rate-limit failures required before escalation is offered.
pub const ESCALATION_THRESHOLD: u32 = 2;

/// Retry policy combining backoff, jitter, classification, escalation, and
/// sleeper.
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    rate_limited: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    escalation: Option<Arc<dyn Escalation<E>>>,
    auth_mode: AuthMode,
    sleeper: Arc<dyn Sleeper>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff.clone(),
            jitter: self.jitter.clone(),
            should_retry: self.should_retry.clone(),
            rate_limited: self.rate_limited.clone(),
            escalation: self.escalation.clone(),
            auth_mode: self.auth_mode,
            sleeper: self.sleeper.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("auth_mode", &self.auth_mode)
            .field("escalation", &self.escalation.as_ref().map(|_| "<hook>"))
            .field("should_retry", &"<predicate>")
            .field("rate_limited", &"<predicate>")
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

/// Mutable counters scoped to a single `execute` call.
struct AttemptState {
    /// 1-based attempt number; reset to 1 by an accepted escalation.
    attempt: usize,
    consecutive_rate_limits: u32,
    escalation_offered: bool,
}

impl AttemptState {
    fn new() -> Self {
        Self { attempt: 1, consecutive_rate_limits: 0, escalation_offered: false }
    }
}

impl<E> RetryPolicy<E>
where
    E: ErrorStatus + std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Execute an async operation with retry and escalation semantics.
    ///
    /// Returns the operation's value on the first success. On failure,
    /// returns the error from the last attempt unchanged.
    pub async fn execute<T, Fut, Op>(&self, mut operation: Op) -> Result<T, E>
    where
        T: Send,
        Fut: Future<Output = Result<T, E>> + Send,
        Op: FnMut() -> Fut + Send,
    {
        let mut state = AttemptState::new();

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !(self.should_retry)(&error) {
                return Err(error);
            }

            if (self.rate_limited)(&error) {
                state.consecutive_rate_limits += 1;
            } else {
                state.consecutive_rate_limits = 0;
            }

            // Escalation is checked before the budget so a hook that accepts
            // on the final attempt still grants a fresh budget.
            if self.may_escalate(&state) {
                if let Some(hook) = &self.escalation {
                    state.escalation_offered = true;
                    match hook.on_persistent_rate_limit(self.auth_mode, &error).await {
                        Some(target) => {
                            tracing::info!(
                                backend = %target,
                                consecutive = state.consecutive_rate_limits,
                                "escalation accepted; resetting retry budget"
                            );
                            state.attempt = 1;
                            state.consecutive_rate_limits = 0;
                            // Retry immediately; no backoff for this cycle.
                            continue;
                        }
                        None => {
                            tracing::debug!(error = %error, "escalation declined");
                        }
                    }
                }
            }

            if state.attempt >= self.max_attempts {
                return Err(error);
            }

            let delay = self.jitter.apply(self.backoff.delay(state.attempt));
            tracing::debug!(
                attempt = state.attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after backoff"
            );
            self.sleeper.sleep(delay).await;
            state.attempt += 1;
        }
    }

    fn may_escalate(&self, state: &AttemptState) -> bool {
        self.auth_mode.allows_escalation()
            && !state.escalation_offered
            && state.consecutive_rate_limits >= ESCALATION_THRESHOLD
    }
}

/// Builder for `RetryPolicy`.
pub struct RetryPolicyBuilder<E> {
    max_attempts: usize,
    backoff: Backoff,
    jitter: Jitter,
    should_retry: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    rate_limited: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    escalation: Option<Arc<dyn Escalation<E>>>,
    auth_mode: AuthMode,
    sleeper: Arc<dyn Sleeper>,
}

/// Errors produced while building a retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `max_attempts` must be > 0.
    InvalidMaxAttempts(usize),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::InvalidMaxAttempts(n) => {
                write!(f, "max_attempts must be > 0 (got {})", n)
            }
        }
    }
}

impl std::error::Error for BuildError {}

impl<E> RetryPolicyBuilder<E>
where
    E: ErrorStatus + std::error::Error + Send + Sync + 'static,
{
    /// Create a builder with the default policy: 5 attempts, 5 s base delay
    /// doubling to a 30 s cap, `[0.7, 1.3]` jitter, status-based
    /// classification, no escalation hook, `AuthMode::ApiKey`.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            jitter: Jitter::multiplicative(),
            should_retry: Arc::new(default_should_retry::<E>),
            rate_limited: Arc::new(default_rate_limited::<E>),
            escalation: None,
            auth_mode: AuthMode::ApiKey,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the backoff schedule.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the jitter strategy.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Predicate deciding whether a failure is retryable at all.
    ///
    /// Replacing this does not affect escalation eligibility; see
    /// [`rate_limited`](Self::rate_limited).
    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Predicate deciding whether a failure counts toward the consecutive
    /// rate-limit counter.
    pub fn rate_limited<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.rate_limited = Arc::new(predicate);
        self
    }

    /// Install an escalation hook, invoked after sustained rate-limiting.
    pub fn on_persistent_rate_limit<H>(mut self, hook: H) -> Self
    where
        H: Escalation<E> + 'static,
    {
        self.escalation = Some(Arc::new(hook));
        self
    }

    /// Set the caller's authentication mode. `ApiKey` disables escalation.
    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Provide a custom sleeper implementation.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Build the retry policy, validating inputs.
    pub fn build(self) -> Result<RetryPolicy<E>, BuildError> {
        if self.max_attempts == 0 {
            return Err(BuildError::InvalidMaxAttempts(0));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            jitter: self.jitter,
            should_retry: self.should_retry,
            rate_limited: self.rate_limited,
            escalation: self.escalation,
            auth_mode: self.auth_mode,
            sleeper: self.sleeper,
        })
    }
}

impl<E> Default for RetryPolicyBuilder<E>
where
    E: ErrorStatus + std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
