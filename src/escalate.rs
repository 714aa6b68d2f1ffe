//! Escalation to a fallback backend after sustained rate-limiting.
//!
//! The retry controller does not decide what the fallback target is; it
//! invokes a caller-supplied [`Escalation`] hook and acts only on the
//! `Some`/`None` verdict. Whether escalation is offered at all depends on the
//! caller's [`AuthMode`].

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// How the caller is authenticated against the remote service.
///
/// Only used to gate escalation: API-key callers pay per request and are
/// never switched to a fallback backend behind their back; other modes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Direct API-key authentication. Never triggers escalation.
    ApiKey,
    /// OAuth/session authentication. Eligible for escalation.
    OAuth,
}

impl AuthMode {
    /// Whether this mode permits offering escalation at all.
    pub fn allows_escalation(self) -> bool {
        !matches!(self, AuthMode::ApiKey)
    }
}

/// Opaque label for the backend an escalation switches to.
///
/// The retry controller never inspects the contents; it only distinguishes
/// an accepted offer (`Some`) from a declined one (`None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationTarget(String);

impl EscalationTarget {
    /// Wrap a backend label.
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self(label.into())
    }

    /// The backend label.
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EscalationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hook invoked when consecutive rate-limit failures reach the escalation
/// threshold.
///
/// Returning `Some(target)` accepts the offer: the controller resets its
/// retry budget and continues the original operation immediately. Returning
/// `None` declines; the original error flow continues unaffected.
#[async_trait]
pub trait Escalation<E>: Send + Sync {
    /// Decide whether to switch backends after sustained rate-limiting.
    async fn on_persistent_rate_limit(
        &self,
        auth_mode: AuthMode,
        last_error: &E,
    ) -> Option<EscalationTarget>;
}

/// Adapter turning a closure into an [`Escalation`] hook.
///
/// The closure inspects the error synchronously and returns a future that
/// owns everything it needs; hooks that must borrow the error across an
/// await implement [`Escalation`] directly.
///
/// ```rust
/// use backstop::{AuthMode, EscalationFn, EscalationTarget};
///
/// let hook = EscalationFn::<std::io::Error>::new(|_auth, _err| {
///     Box::pin(async { Some(EscalationTarget::new("cheap-backend")) })
/// });
/// # let _ = hook;
/// ```
pub struct EscalationFn<E> {
    #[allow(clippy::type_complexity)]
    f: Arc<dyn Fn(AuthMode, &E) -> BoxFuture<'static, Option<EscalationTarget>> + Send + Sync>,
}

impl<E> EscalationFn<E> {
    /// Wrap an async closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(AuthMode, &E) -> BoxFuture<'static, Option<EscalationTarget>>
            + Send
            + Sync
            + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl<E> Clone for EscalationFn<E> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<E> fmt::Debug for EscalationFn<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<E: Sync> Escalation<E> for EscalationFn<E> {
    async fn on_persistent_rate_limit(
        &self,
        auth_mode: AuthMode,
        last_error: &E,
    ) -> Option<EscalationTarget> {
        (self.f)(auth_mode, last_error).await
    }
}
