#![forbid(unsafe_code)]

//! # Backstop
//!
//! Retry controller for async operations against rate-limited services.
//!
//! ## Features
//!
//! - **Exponential backoff** with a cap and multiplicative jitter
//! - **Status-based classification**: 429/5xx retryable by default, with
//!   separate rate-limit detection driving escalation
//! - **Escalation**: after sustained rate-limiting, a caller-supplied hook
//!   may switch to a fallback backend; an accepted offer resets the retry
//!   budget and continues the operation transparently
//! - **Auth-gated policy**: API-key callers are never escalated
//! - **Checkpoint store**: keyed JSON blob persistence with lazy init
//! - **Injectable time and randomness** for deterministic tests
//!
//! ## Quick Start
//!
//! ```rust
//! use backstop::{ErrorStatus, RetryPolicy};
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
//! #[tokio::main]
//! async fn main() {
//!     let policy = RetryPolicy::<ApiError>::builder().build().unwrap();
//!     let result = policy.execute(|| async {
//!         // Your async operation here
//!         Ok::<_, ApiError>("response")
//!     }).await;
//!     assert!(result.is_ok());
//! }
//! ```

pub mod backoff;
pub mod checkpoint;
pub mod classify;
pub mod escalate;
pub mod jitter;
pub mod retry;
pub mod sleeper;

// Re-exports
pub use backoff::{Backoff, BackoffError};
pub use checkpoint::{CheckpointError, CheckpointStore};
pub use classify::ErrorStatus;
pub use escalate::{AuthMode, Escalation, EscalationFn, EscalationTarget};
pub use jitter::Jitter;
pub use retry::{BuildError, RetryPolicy, RetryPolicyBuilder};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
