//! Status-based error classification.
//!
//! Two distinct classification points feed the retry loop:
//! - retryability (`default_should_retry`) decides whether a failure is worth
//!   retrying at all — 429 and 5xx by default;
//! - rate-limit detection (`default_rate_limited`) decides whether a failure
//!   counts toward the consecutive rate-limit counter that drives escalation —
//!   429 only.
//!
//! They must stay separate: a custom retry predicate may retry errors that are
//! not rate-limit errors, and those must not advance the escalation counter.

/// Status code signalling rate limiting.
pub const STATUS_RATE_LIMITED: u16 = 429;

/// Access to the optional numeric status carried by an operation error.
///
/// Errors without a status (connection resets, deserialization failures, …)
/// return `None` and are non-retryable under the default classification.
pub trait ErrorStatus {
    /// Numeric status/error code, if the failure carries one.
    fn status(&self) -> Option<u16>;
}

/// Default retryability: 429 or any 5xx. Everything else (4xx, statusless)
/// propagates on first occurrence without consuming the attempt budget.
pub fn default_should_retry<E: ErrorStatus>(error: &E) -> bool {
    matches!(error.status(), Some(STATUS_RATE_LIMITED) | Some(500..=599))
}

/// Default rate-limit detection: status 429.
pub fn default_rate_limited<E: ErrorStatus>(error: &E) -> bool {
    error.status() == Some(STATUS_RATE_LIMITED)
}
