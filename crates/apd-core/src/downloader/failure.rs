//! Terminal failure of one resource after its attempt sequence ended.

use crate::retry::{FetchError, RetryError};
use std::io;
use thiserror::Error;

/// Why a resource did not end in a committed catalog or cache hit.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Non-retryable transport-level failure.
    #[error("transport failure: {0}")]
    Transport(#[source] FetchError),
    /// Non-retryable HTTP status (e.g. 403, 404).
    #[error("HTTP {0}")]
    HttpStatus(u32),
    /// Retryable failures persisted through the attempt limit.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: FetchError,
    },
    /// Staged content did not match the streamed digest; nothing committed.
    #[error("integrity check failed: {0}")]
    Integrity(String),
    /// Local filesystem failure while staging or committing.
    #[error("storage failure: {0}")]
    Storage(#[source] io::Error),
    #[error("cancelled")]
    Cancelled,
}

impl From<RetryError> for FetchFailure {
    fn from(e: RetryError) -> Self {
        match e {
            RetryError::Fatal(FetchError::Http(code)) => FetchFailure::HttpStatus(code),
            RetryError::Fatal(FetchError::Storage(io_err)) => FetchFailure::Storage(io_err),
            RetryError::Fatal(FetchError::Cancelled) => FetchFailure::Cancelled,
            RetryError::Fatal(other) => FetchFailure::Transport(other),
            RetryError::Exhausted { last, state } => FetchFailure::RetriesExhausted {
                attempts: state.attempts,
                last,
            },
        }
    }
}
