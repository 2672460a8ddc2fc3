//! Attempt-level fetch error for retry classification.

use std::fmt;

/// Error produced by a single fetch attempt (curl failure, HTTP error,
/// short body, storage failure, or cancellation). Classified by the retry
/// policy before the downloader converts it to a terminal failure.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Transport(curl::Error),
    /// Response status outside {200, 304}.
    Http(u32),
    /// Body ended before the advertised Content-Length (e.g. server closed
    /// early). Retried instead of committing a truncated file.
    PartialTransfer { expected: u64, received: u64 },
    /// Writing the streamed body failed (disk full, permissions). Not retried.
    Storage(std::io::Error),
    /// The run's cancel token was set mid-transfer. Not retried.
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            FetchError::Storage(e) => write!(f, "storage: {}", e),
            FetchError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Transport(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Http(_) | FetchError::PartialTransfer { .. } | FetchError::Cancelled => {
                None
            }
        }
    }
}
