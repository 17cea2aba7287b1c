//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RegistrationConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Retry delays for failed registration attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retrying after `failures` consecutive failures,
    /// never longer than `ceiling` when one is given.
    pub fn delay(&self, failures: u32, ceiling: Option<Duration>) -> Duration {
        let delay = calculate_backoff(
            failures,
            self.base.as_millis() as u64,
            self.max.as_millis() as u64,
        );
        match ceiling {
            Some(ceiling) => delay.min(ceiling),
            None => delay,
        }
    }
}

impl From<&RegistrationConfig> for BackoffPolicy {
    fn from(config: &RegistrationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RegistrationConfig::default())
    }
}
