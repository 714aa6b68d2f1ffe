//! Abstraction for sleeping between attempts.
//!
//! The retry loop suspends cooperatively between attempts; nothing blocks the
//! runtime. Dropping the future returned by `sleep` (task cancellation)
//! schedules nothing further. Injecting a sleeper keeps tests fast and lets
//! them assert on the exact delay sequence.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction for sleeping/waiting.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper using the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that resolves immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested delay without waiting.
#[derive(Debug, Clone)]
pub struct TrackingSleeper {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    /// Create an empty tracking sleeper.
    pub fn new() -> Self {
        Self { requested: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Number of sleeps requested so far.
    pub fn calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    /// Delay requested by the `idx`-th sleep, if any.
    pub fn call_at(&self, idx: usize) -> Option<Duration> {
        self.requested.lock().unwrap().get(idx).copied()
    }

    /// All requested delays, in order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.requested.lock().unwrap().clone()
    }
}

impl Default for TrackingSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.requested.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}
