//! Retry and backoff policy.
//!
//! Encapsulates error classification (timeouts, throttling, connection
//! failures, retryable HTTP statuses) and exponential backoff decisions so
//! the downloader applies one consistent policy to every resource.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, RetryError, RetryState};
