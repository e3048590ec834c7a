//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Number of extra attempts beyond the first when the caller does not say.
pub const DEFAULT_RETRY_BUDGET: u32 = 2;

/// Exponential backoff schedule.
///
/// No jitter. `max_delay` is unset unless configured.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first failed attempt.
    pub base_delay: Duration,

    /// Growth factor per attempt.
    pub multiplier: f64,

    /// Optional ceiling for a single wait.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RetryPolicy {
    /// 1s, 2s, 4s, ...
    pub fn standard() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            multiplier: 2.0,
            max_delay: None,
        }
    }

    pub fn new(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay,
            multiplier,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Wait before retrying after `attempt` failed.
    ///
    /// # Arguments
    /// * `attempt` - The attempt that just failed (0-indexed).
    ///
    /// delay = base_delay * multiplier^attempt, saturating at `Duration::MAX`
    /// and clamped to `max_delay` when set.
    ///
    /// Example with base_delay=1s, multiplier=2.0:
    /// - attempt 0: 1s
    /// - attempt 1: 2s
    /// - attempt 2: 4s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // negative or NaN multipliers never sleep; overflow saturates
        let delay = if delay_secs.is_nan() || delay_secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
        };
        match self.max_delay {
            Some(max_delay) => delay.min(max_delay),
            None => delay,
        }
    }

    /// Sum of every wait a request with `retry_budget` can incur.
    pub fn total_backoff(&self, retry_budget: u32) -> Duration {
        (0..retry_budget)
            .map(|attempt| self.next_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
