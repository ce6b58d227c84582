//! Exponential backoff for service readiness polling
//!
//! Freshly started database containers take a while before they accept
//! connections. The preflight check polls them with growing delays.

use std::time::Duration;

/// Exponential backoff between readiness attempts.
///
/// # Example
///
/// ```
/// use pwprobe_harness::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(250, 4_000);
///
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(250));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(500));
/// assert_eq!(backoff.calculate_delay(10), Duration::from_millis(4_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    /// Delay before the first retry
    initial_ms: u64,
    /// Cap for exponential growth
    max_ms: u64,
    multiplier: f64,
}

impl BackoffStrategy {
    /// Create a backoff that starts at `initial_ms` and never exceeds `max_ms`
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms: initial_ms.max(1),
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
        }
    }

    /// Set the growth multiplier (at least 1.0)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(attempt.min(64) as i32);
        Duration::from_millis(delay_ms.min(self.max_ms as f64) as u64)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for BackoffStrategy {
    /// 500ms initial, 5 seconds max, 2x multiplier
    fn default() -> Self {
        Self::new(500, 5_000)
    }
}
