//! Backoff for delivery readiness.

use std::time::Duration;

/// Bounded exponential backoff applied while the receiving end does not
/// exist yet (e.g. a content script that has not finished loading).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for a single delay.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Spread delays by up to 10% either way.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Calculate delay for a given attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            (delay + rand_jitter(delay * 0.1)).max(0.0) as u64
        } else {
            delay as u64
        };

        Duration::from_millis(delay_ms)
    }

    /// Upper bound on the total time spent waiting between attempts.
    pub fn max_total_delay(&self) -> Duration {
        let spread = if self.jitter { 1.1 } else { 1.0 };
        (0..self.max_retries)
            .map(|attempt| {
                let delay = self.base_delay.as_millis() as f64
                    * self.backoff_multiplier.powi(attempt as i32);
                delay.min(self.max_delay.as_millis() as f64) * spread
            })
            .map(|ms| Duration::from_millis(ms.ceil() as u64))
            .sum()
    }
}

/// Simple jitter using system time.
fn rand_jitter(max: f64) -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos as f64 / 1_000_000_000.0) * max * 2.0 - max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_then_caps() {
        let config = RetryConfig {
            max_retries: 6,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let config = RetryConfig::default();
        for attempt in 0..5 {
            let plain = config.clone().without_jitter().delay_for_attempt(attempt);
            let jittered = config.delay_for_attempt(attempt);
            let low = plain.mul_f64(0.89);
            let high = plain.mul_f64(1.11);
            assert!(jittered >= low && jittered <= high, "{:?} vs {:?}", jittered, plain);
        }
    }

    #[test]
    fn test_max_total_delay() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: false,
        };
        assert_eq!(config.max_total_delay(), Duration::from_millis(700));
        assert_eq!(RetryConfig::none().max_total_delay(), Duration::ZERO);
    }
}
