//! Reconnect budget and backoff calculation.
//!
//! Portable, sync-only building blocks. Scheduling the actual timer is the
//! connection manager's job; this module only answers "how long, and may we".
//!
//! - [`RetryBudget`]: Attempt counter with linear backoff
//! - [`linear_backoff_delay`]: `base * attempt`

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default maximum reconnect attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 3000;

// ─────────────────────────────────────────────────────────────────────────────
// Backoff
// ─────────────────────────────────────────────────────────────────────────────

/// Delay before reconnect attempt `attempt` (1-based): `base * attempt`.
pub fn linear_backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(attempt)
}

/// Counts consecutive reconnect attempts since the last successful open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryBudget {
    max_retries: u32,
    base_delay: Duration,
    attempts: u32,
}

impl RetryBudget {
    /// Fresh budget with no attempts spent.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempts: 0,
        }
    }

    /// Attempts spent so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reset after a successful open or an explicit (re)connect.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Whether every attempt has been spent.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }

    /// Spend one attempt and return its delay, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(linear_backoff_delay(self.attempts, self.base_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly() {
        let base = Duration::from_secs(3);
        assert_eq!(linear_backoff_delay(1, base), Duration::from_secs(3));
        assert_eq!(linear_backoff_delay(2, base), Duration::from_secs(6));
        assert_eq!(linear_backoff_delay(5, base), Duration::from_secs(15));
    }

    #[test]
    fn budget_yields_max_retries_delays_then_none() {
        let mut budget = RetryBudget::new(5, Duration::from_millis(3000));
        let delays: Vec<u64> = std::iter::from_fn(|| budget.next_delay())
            .map(|d| u64::try_from(d.as_millis()).unwrap())
            .collect();
        assert_eq!(delays, vec![3000, 6000, 9000, 12000, 15000]);
        assert!(budget.is_exhausted());
        assert_eq!(budget.attempts(), 5);
        assert!(budget.next_delay().is_none());
        assert_eq!(budget.attempts(), 5);
    }

    #[test]
    fn reset_restores_budget() {
        let mut budget = RetryBudget::new(2, Duration::from_secs(1));
        let _ = budget.next_delay();
        let _ = budget.next_delay();
        assert!(budget.is_exhausted());
        budget.reset();
        assert_eq!(budget.attempts(), 0);
        assert_eq!(budget.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_retries_is_immediately_exhausted() {
        let mut budget = RetryBudget::new(0, Duration::from_secs(1));
        assert!(budget.is_exhausted());
        assert!(budget.next_delay().is_none());
    }
}
