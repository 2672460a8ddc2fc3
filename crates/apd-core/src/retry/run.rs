//! Retry loop: run a fetch attempt until success or the policy says stop.

use super::classify;
use super::error::FetchError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::control::CancelToken;
use std::fmt;
use std::time::Duration;

/// Progress of one resource's attempt sequence. Discarded on terminal outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryState {
    /// Attempts made so far (1-based after the first call).
    pub attempts: u32,
    /// Total backoff delay slept across all attempts.
    pub cumulative_delay: Duration,
}

/// Terminal outcome of the retry loop.
#[derive(Debug)]
pub enum RetryError {
    /// The error was not retryable (non-retryable status, storage, cancel).
    Fatal(FetchError),
    /// Retryable failures persisted through the attempt limit.
    Exhausted { last: FetchError, state: RetryState },
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(e) => write!(f, "{}", e),
            RetryError::Exhausted { last, state } => {
                write!(f, "gave up after {} attempts: {}", state.attempts, last)
            }
        }
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Fatal(e) => Some(e),
            RetryError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Runs `f` until it succeeds or the retry policy says to stop.
///
/// Backoff sleeps suspend only the calling worker; sibling resources keep
/// making progress. A set cancel token ends the sequence before the next
/// sleep instead of waiting it out.
pub fn run_with_retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut f: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut state = RetryState::default();
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                state.attempts = attempt;
                let kind = classify::classify(&e, &policy.retryable_statuses);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return Err(if kind == ErrorKind::Other {
                            RetryError::Fatal(e)
                        } else {
                            RetryError::Exhausted { last: e, state }
                        });
                    }
                    RetryDecision::RetryAfter(d) => {
                        if cancel.is_cancelled() {
                            return Err(RetryError::Fatal(FetchError::Cancelled));
                        }
                        tracing::debug!(
                            attempt,
                            delay_ms = d.as_millis() as u64,
                            error = %e,
                            "retryable failure, backing off"
                        );
                        std::thread::sleep(d);
                        state.cumulative_delay += d;
                        attempt += 1;
                    }
                }
            }
        }
    }
}
