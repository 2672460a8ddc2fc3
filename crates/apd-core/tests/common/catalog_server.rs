//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves configurable per-path routes with ETag and `If-None-Match`
//! support, plus failure injection (error statuses for the first N hits,
//! truncated bodies, slow responses). Tracks per-path hit counts and the
//! peak number of concurrent connections.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Behavior of one served path.
#[derive(Debug, Clone)]
pub struct Route {
    pub body: Vec<u8>,
    pub etag: Option<String>,
    /// Status for normal responses (after any injected failures).
    pub status: u16,
    /// Respond with `fail_status` this many times before behaving normally.
    pub fail_first: u32,
    pub fail_status: u16,
    /// Declare the full Content-Length but send only this many bytes,
    /// then close the connection.
    pub truncate: Option<usize>,
    /// Hold the connection open this long before responding.
    pub delay_ms: u64,
    /// Always send a full 200 even when `If-None-Match` matches.
    pub ignore_conditional: bool,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            body: Vec::new(),
            etag: None,
            status: 200,
            fail_first: 0,
            fail_status: 503,
            truncate: None,
            delay_ms: 0,
            ignore_conditional: false,
        }
    }
}

struct RouteState {
    route: Route,
    hits: u32,
    fails_left: u32,
}

struct State {
    routes: Mutex<HashMap<String, RouteState>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct CatalogServer {
    base_url: String,
    state: Arc<State>,
}

impl CatalogServer {
    /// Starts the server on an ephemeral port. Runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State {
            routes: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || {
                    let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
                    state.peak.fetch_max(now, Ordering::SeqCst);
                    handle(stream, &state);
                    state.active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Install or replace a route. Preserves the path's cumulative hit
    /// counter across replacements; only the injected-failure budget resets.
    pub fn set_route(&self, path: &str, route: Route) {
        let fails_left = route.fail_first;
        let mut routes = self.state.routes.lock().unwrap();
        let hits = routes.get(path).map(|rs| rs.hits).unwrap_or(0);
        routes.insert(
            path.to_string(),
            RouteState {
                route,
                hits,
                fails_left,
            },
        );
    }

    pub fn hits(&self, path: &str) -> u32 {
        self.state
            .routes
            .lock()
            .unwrap()
            .get(path)
            .map(|r| r.hits)
            .unwrap_or(0)
    }

    /// Highest number of connections open at once since start.
    pub fn peak_connections(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

fn handle(mut stream: TcpStream, state: &State) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));

    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let (path, if_none_match) = parse_request(&request);

    let (route, injected_failure) = {
        let mut routes = state.routes.lock().unwrap();
        match routes.get_mut(&path) {
            None => {
                write_response(&mut stream, 404, None, b"not found", None);
                return;
            }
            Some(rs) => {
                rs.hits += 1;
                let failing = rs.fails_left > 0;
                if failing {
                    rs.fails_left -= 1;
                }
                (rs.route.clone(), failing)
            }
        }
    };

    if route.delay_ms > 0 {
        thread::sleep(Duration::from_millis(route.delay_ms));
    }

    if injected_failure {
        write_response(&mut stream, route.fail_status, None, b"", None);
        return;
    }

    if route.status != 200 {
        write_response(&mut stream, route.status, route.etag.as_deref(), b"", None);
        return;
    }

    if !route.ignore_conditional {
        if let (Some(tag), Some(sent)) = (route.etag.as_deref(), if_none_match.as_deref()) {
            if sent == tag {
                write_response(&mut stream, 304, Some(tag), b"", None);
                return;
            }
        }
    }

    write_response(
        &mut stream,
        200,
        route.etag.as_deref(),
        &route.body,
        route.truncate,
    );
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

/// Returns (request path, If-None-Match value with quotes stripped).
fn parse_request(request: &str) -> (String, Option<String>) {
    let mut path = String::from("/");
    let mut if_none_match = None;
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if i == 0 {
            if let Some(p) = line.split_whitespace().nth(1) {
                path = p.to_string();
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("if-none-match") {
                if_none_match = Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    (path, if_none_match)
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    etag: Option<&str>,
    body: &[u8],
    truncate: Option<usize>,
) {
    let reason = match status {
        200 => "OK",
        304 => "Not Modified",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let mut headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason,
        body.len()
    );
    if let Some(tag) = etag {
        headers.push_str(&format!("ETag: \"{}\"\r\n", tag));
    }
    headers.push_str("\r\n");
    let _ = stream.write_all(headers.as_bytes());
    let slice = match truncate {
        Some(n) => &body[..n.min(body.len())],
        None => body,
    };
    let _ = stream.write_all(slice);
    // Dropping the stream closes the socket; a truncated body is observed
    // by the client as a connection cut mid-transfer.
}
