//! Bounded retry with exponential backoff

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Attempt budget and delay schedule
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Constant delay between attempts
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            multiplier: 1,
            max_delay: delay,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier: 2,
            max_delay,
        }
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after attempt number `attempt` failed
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `op` until it succeeds or the attempt budget is spent
    ///
    /// `op` receives the 1-based attempt number. On exhaustion the last error
    /// is returned together with the number of attempts made.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) => {
                    let delay = self.delay(attempt);
                    warn!(
                        "⚠️ {} failed (attempt {}/{}): {}, retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(last) => {
                    return Err(Exhausted {
                        attempts: attempt,
                        last,
                    })
                }
            }
        }
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last: E,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::exponential(5, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(5));

        let fixed = RetryPolicy::fixed(3, Duration::from_millis(2000));
        assert_eq!(fixed.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_should_retry_respects_budget() {
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[tokio::test]
    async fn test_run_succeeds_after_failures() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let result: Result<u32, Exhausted<String>> = policy
            .run("flaky", |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {}", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_run_reports_exhaustion() {
        let policy = RetryPolicy::fixed(2, Duration::ZERO);
        let result: Result<(), _> = tokio_test::block_on(
            policy.run("doomed", |attempt| async move { Err(format!("boom {}", attempt)) }),
        );
        let exhausted = tokio_test::assert_err!(result);
        assert_eq!(exhausted.attempts, 2);
        assert_eq!(exhausted.last, "boom 2");
    }
}
