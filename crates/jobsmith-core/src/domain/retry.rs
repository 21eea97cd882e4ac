//! Retry policy: decides how many delivery attempts to make and how long to wait
//! between them.

use rand::Rng;
use std::time::Duration;

/// Bounded retry with exponential backoff.
///
/// `max_attempts == 1` means a single attempt and no retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Upper bound of the random extra delay, as a fraction of the computed delay.
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier: 2.0,
            jitter: 0.2,
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before the next attempt, without jitter.
    ///
    /// delay = base_delay * multiplier^(attempts - 1), so with base=500ms, multiplier=2.0:
    /// after attempt 1: 500ms, after attempt 2: 1s, after attempt 3: 2s.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }

    /// [`next_delay`](Self::next_delay) plus a uniformly random extra in
    /// `[0, jitter * delay]`.
    pub fn next_delay_with_jitter(&self, attempts: u32) -> Duration {
        let delay = self.next_delay(attempts);
        if self.jitter <= 0.0 {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.0..=self.jitter);
        delay + delay.mul_f64(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}
