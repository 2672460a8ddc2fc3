//! Classify HTTP statuses and transport errors into retry policy error kinds.

use super::error::FetchError;
use super::policy::ErrorKind;

/// Classify an HTTP status code against the configured retryable set.
pub fn classify_http_status(code: u32, retryable_statuses: &[u16]) -> ErrorKind {
    let code16 = match u16::try_from(code) {
        Ok(c) => c,
        Err(_) => return ErrorKind::Other,
    };
    if !retryable_statuses.contains(&code16) {
        return ErrorKind::Other;
    }
    match code16 {
        429 | 503 => ErrorKind::Throttled,
        _ => ErrorKind::HttpRetryable(code16),
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a fetch attempt error into an ErrorKind.
pub fn classify(e: &FetchError, retryable_statuses: &[u16]) -> ErrorKind {
    match e {
        FetchError::Transport(ce) => classify_curl_error(ce),
        FetchError::Http(code) => classify_http_status(*code, retryable_statuses),
        FetchError::PartialTransfer { .. } => ErrorKind::Connection,
        FetchError::Storage(_) | FetchError::Cancelled => ErrorKind::Other,
    }
}
