//! Time provider abstraction.
//!
//! Lock expiry, heartbeat timeouts, and verify periods all compare points
//! in time. Tying those comparisons to the wall clock directly would make
//! them untestable, so everything takes a [`TimeProvider`]: production code
//! uses [`SystemTimeProvider`], tests drive a [`ManualClock`] forward by
//! hand.
//!
//! Time is expressed as a `Duration` since the provider's epoch, never as a
//! caller-supplied timestamp — a caller's clock must never influence when a
//! lock expires (clock skew would otherwise let a client bypass expiry).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

/// Provider of the current time and of delays.
#[async_trait]
pub trait TimeProvider: Send + Sync {
    /// Current time as a duration since the provider's epoch.
    fn now(&self) -> Duration;

    /// Sleep for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock provider backed by a monotonic start instant and tokio sleeps.
#[derive(Debug, Clone)]
pub struct SystemTimeProvider {
    start: std::time::Instant,
}

impl SystemTimeProvider {
    /// Create a provider whose epoch is the moment of creation.
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually advanced clock for tests.
///
/// `sleep` advances the clock instead of waiting, so timing-dependent code
/// runs instantly and deterministically under test.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at the given time.
    pub fn at(now: Duration) -> Self {
        Self {
            now_ms: AtomicU64::new(now.as_millis() as u64),
        }
    }

    /// Advance the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now_ms
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl TimeProvider for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::at(Duration::from_secs(10));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(10_500));
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_secs(30)).await;
        assert_eq!(clock.now(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_system_provider_is_monotonic() {
        let provider = SystemTimeProvider::new();
        let a = provider.now();
        let b = provider.now();
        assert!(b >= a);
    }
}
