//! Bounded pool of reusable curl Easy handles.
//!
//! libcurl keeps the underlying TCP/TLS connection alive inside a handle,
//! so returning handles to the pool gives connection reuse across fetches.
//! The pool never holds more than `capacity` handles; when all are out,
//! `acquire` blocks on a condvar until one comes back.

use curl::easy::Easy;
use std::sync::{Arc, Condvar, Mutex};

struct PoolState {
    idle: Vec<Easy>,
    /// Handles created so far, idle or checked out.
    created: usize,
}

struct PoolInner {
    capacity: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Shared handle pool. Clones refer to the same pool.
#[derive(Clone)]
pub struct HandlePool {
    inner: Arc<PoolInner>,
}

impl HandlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                capacity: capacity.max(1),
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    created: 0,
                }),
                available: Condvar::new(),
            }),
        }
    }

    /// Checks out a handle, creating one lazily while under capacity and
    /// blocking otherwise. The handle returns to the pool on drop.
    pub fn acquire(&self) -> PooledHandle {
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if let Some(easy) = state.idle.pop() {
                return PooledHandle {
                    easy: Some(easy),
                    inner: Arc::clone(&self.inner),
                };
            }
            if state.created < self.inner.capacity {
                state.created += 1;
                return PooledHandle {
                    easy: Some(Easy::new()),
                    inner: Arc::clone(&self.inner),
                };
            }
            state = self.inner.available.wait(state).unwrap();
        }
    }

    /// Handles created over the pool's lifetime (idle or checked out).
    pub fn created(&self) -> usize {
        self.inner.state.lock().unwrap().created
    }
}

/// RAII checkout from a `HandlePool`.
pub struct PooledHandle {
    easy: Option<Easy>,
    inner: Arc<PoolInner>,
}

impl PooledHandle {
    pub fn easy(&mut self) -> &mut Easy {
        // Present from construction until drop.
        self.easy.as_mut().unwrap()
    }
}

impl Drop for PooledHandle {
    fn drop(&mut self) {
        if let Some(easy) = self.easy.take() {
            let mut state = self.inner.state.lock().unwrap();
            state.idle.push(easy);
            drop(state);
            self.inner.available.notify_one();
        }
    }
}
