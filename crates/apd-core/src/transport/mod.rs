//! HTTP transport: one conditional GET per call over a reusable curl handle.
//!
//! Uses the curl crate (libcurl) for blocking transfers. Handles come from
//! the pool in `pool`; each fetch resets the handle before configuring it,
//! so no options leak between requests. Runs in the current thread; call
//! from `spawn_blocking` if used from async code.

mod pool;

pub use pool::{HandlePool, PooledHandle};

use crate::control::CancelToken;
use crate::retry::FetchError;
use std::cell::{Cell, RefCell};
use std::io;
use std::str;
use std::time::Duration;

/// Per-request knobs derived from configuration.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub connect_timeout: Duration,
    /// Abort if the transfer stalls (no bytes) for this long.
    pub read_timeout: Duration,
    /// Upper bound on the whole transfer.
    pub total_timeout: Duration,
    pub chunk_size: usize,
    pub user_agent: String,
}

/// What the server said for one completed GET.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final HTTP status after redirects.
    pub status: u32,
    /// `ETag` of the delivered representation, quotes stripped.
    pub etag: Option<String>,
    /// Declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    /// Body bytes actually passed to the sink.
    pub bytes_received: u64,
}

/// Performs a GET, streaming the body into `sink` chunk by chunk.
///
/// When `validator` is set, the request carries `If-None-Match` and the
/// server may answer 304 with no body. The sink only sees bytes for a 200
/// response; error bodies are drained and discarded. A sink error or a
/// set cancel token aborts the transfer from inside the write callback.
pub fn fetch(
    easy: &mut curl::easy::Easy,
    url: &str,
    validator: Option<&str>,
    opts: &RequestOptions,
    cancel: &CancelToken,
    sink: &mut dyn FnMut(&[u8]) -> io::Result<()>,
) -> Result<FetchResponse, FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    easy.reset();
    easy.url(url).map_err(FetchError::Transport)?;
    easy.useragent(&opts.user_agent).map_err(FetchError::Transport)?;
    easy.follow_location(true).map_err(FetchError::Transport)?;
    easy.max_redirections(10).map_err(FetchError::Transport)?;
    easy.connect_timeout(opts.connect_timeout)
        .map_err(FetchError::Transport)?;
    // Stall detection: any transfer slower than 1 byte/s for read_timeout
    // seconds is cut off as a timeout.
    easy.low_speed_limit(1).map_err(FetchError::Transport)?;
    easy.low_speed_time(opts.read_timeout)
        .map_err(FetchError::Transport)?;
    easy.timeout(opts.total_timeout).map_err(FetchError::Transport)?;
    easy.buffer_size(opts.chunk_size).map_err(FetchError::Transport)?;

    if let Some(tag) = validator {
        let mut list = curl::easy::List::new();
        list.append(&format!("If-None-Match: \"{}\"", tag))
            .map_err(FetchError::Transport)?;
        easy.http_headers(list).map_err(FetchError::Transport)?;
    }

    // Shared with the transfer callbacks below; read back after perform.
    let status: Cell<u32> = Cell::new(0);
    let etag: RefCell<Option<String>> = RefCell::new(None);
    let content_length: Cell<Option<u64>> = Cell::new(None);
    let bytes: Cell<u64> = Cell::new(0);
    let sink_error: RefCell<Option<io::Error>> = RefCell::new(None);
    let cancelled: Cell<bool> = Cell::new(false);

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    let line = line.trim();
                    if let Some(rest) = line.strip_prefix("HTTP/") {
                        // New status line: a redirect hop starts a fresh
                        // header block, so drop metadata from the prior hop.
                        if let Some(code) = rest
                            .split_whitespace()
                            .nth(1)
                            .and_then(|c| c.parse::<u32>().ok())
                        {
                            status.set(code);
                        }
                        *etag.borrow_mut() = None;
                        content_length.set(None);
                    } else if let Some((name, value)) = line.split_once(':') {
                        let name = name.trim();
                        let value = value.trim();
                        if name.eq_ignore_ascii_case("etag") {
                            *etag.borrow_mut() = Some(value.trim_matches('"').to_string());
                        } else if name.eq_ignore_ascii_case("content-length") {
                            if let Ok(n) = value.parse::<u64>() {
                                content_length.set(Some(n));
                            }
                        }
                    }
                }
                true
            })
            .map_err(FetchError::Transport)?;
        transfer
            .write_function(|data| {
                if cancel.is_cancelled() {
                    cancelled.set(true);
                    return Ok(0); // abort transfer
                }
                // Only a 200 body reaches the sink; anything else (error
                // pages, redirect bodies) is consumed and dropped.
                if status.get() != 200 {
                    return Ok(data.len());
                }
                match sink(data) {
                    Ok(()) => {
                        bytes.set(bytes.get() + data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        *sink_error.borrow_mut() = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(FetchError::Transport)?;

        if let Err(e) = transfer.perform() {
            if cancelled.get() {
                return Err(FetchError::Cancelled);
            }
            if e.is_write_error() {
                if let Some(io_err) = sink_error.borrow_mut().take() {
                    return Err(FetchError::Storage(io_err));
                }
            }
            return Err(FetchError::Transport(e));
        }
    }

    let code = easy.response_code().map_err(FetchError::Transport)?;
    let received = bytes.get();
    let declared = content_length.get();

    if code == 200 {
        if let Some(expected) = declared {
            if received != expected {
                return Err(FetchError::PartialTransfer {
                    expected,
                    received,
                });
            }
        }
    }

    let etag = etag.borrow().clone();
    Ok(FetchResponse {
        status: code,
        etag,
        content_length: declared,
        bytes_received: received,
    })
}
