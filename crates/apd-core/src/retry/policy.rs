use crate::config::RetryConfig;
use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/total).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body).
    Connection,
    /// HTTP status configured as retryable (typically 5xx).
    HttpRetryable(u16),
    /// Any other error; never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with jitter and caps, built from `RetryConfig`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt.
    pub min_wait: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_wait: Duration,
    /// HTTP statuses eligible for retry.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries.max(1),
            min_wait: Duration::from_secs_f64(cfg.min_wait_secs.max(0.0)),
            max_wait: Duration::from_secs_f64(cfg.max_wait_secs.max(cfg.min_wait_secs.max(0.0))),
            retryable_statuses: cfg.retryable_statuses.clone(),
        }
    }

    /// Deterministic backoff base for a 1-based attempt number:
    /// `min(max_wait, min_wait * 2^(attempt-1))`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 1u32 << attempt.saturating_sub(1).min(16);
        self.min_wait.saturating_mul(exp).min(self.max_wait)
    }

    /// Compute the next retry decision for a given attempt and error kind.
    ///
    /// `attempt` is 1-based (1 = first attempt). The returned delay is the
    /// backoff base plus up to `min_wait` of jitter, capped at `max_wait`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::HttpRetryable(_) => {
                let jitter = self.min_wait.mul_f64(rand::random::<f64>());
                let delay = (self.backoff_delay(attempt) + jitter).min(self.max_wait);
                RetryDecision::RetryAfter(delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig::default())
    }

    #[test]
    fn no_retry_for_other() {
        assert_eq!(policy().decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn backoff_base_is_non_decreasing_and_capped() {
        let p = policy();
        let mut prev = Duration::ZERO;
        for attempt in 1..=12 {
            let d = p.backoff_delay(attempt);
            assert!(d >= prev, "attempt {} regressed", attempt);
            assert!(d <= p.max_wait);
            prev = d;
        }
        assert_eq!(p.backoff_delay(1), p.min_wait);
        assert_eq!(p.backoff_delay(12), p.max_wait);
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let mut p = policy();
        p.max_retries = 20;
        for attempt in 1..=10 {
            match p.decide(attempt, ErrorKind::Timeout) {
                RetryDecision::RetryAfter(d) => {
                    assert!(d >= p.backoff_delay(attempt));
                    assert!(d <= p.max_wait);
                }
                RetryDecision::NoRetry => panic!("expected retry at attempt {}", attempt),
            }
        }
    }

    #[test]
    fn respects_max_retries() {
        let mut p = policy();
        p.max_retries = 3;
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }
}
