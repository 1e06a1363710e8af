//! Fixed-window counters

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Allowed,
    Rejected {
        /// Time until the current window closes
        retry_after: Duration,
    },
}

impl Acquire {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Whole seconds to wait, never less than one
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            Self::Allowed => 0,
            Self::Rejected { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                secs.max(1)
            }
        }
    }
}

/// Keyed request counter with atomic increment-and-check
pub trait Limiter: Send + Sync + std::fmt::Debug {
    /// Take one slot for `key`, or report when one frees up
    fn try_acquire(&self, key: &str) -> Acquire;

    /// Return a slot taken by `try_acquire` in the current window
    fn release(&self, key: &str);
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started: Instant,
    count: u32,
}

/// Counter whose windows reset at fixed boundaries
///
/// A limit of `0` admits everything.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Create with requests per minute
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Acquire against a caller-supplied limit instead of the configured one
    pub fn try_acquire_limit(&self, key: &str, limit: u32) -> Acquire {
        if limit == 0 {
            return Acquire::Allowed;
        }

        let now = Instant::now();
        let mut windows = self.windows.lock();
        let state = windows.entry(key.to_string()).or_insert(WindowState {
            started: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(state.started);
        if elapsed >= self.window {
            state.started = now;
            state.count = 0;
        }

        if state.count < limit {
            state.count += 1;
            Acquire::Allowed
        } else {
            Acquire::Rejected {
                retry_after: self
                    .window
                    .saturating_sub(now.saturating_duration_since(state.started)),
            }
        }
    }

    /// Requests counted for `key` in its current window
    pub fn current_count(&self, key: &str) -> u32 {
        let now = Instant::now();
        self.windows
            .lock()
            .get(key)
            .filter(|s| now.saturating_duration_since(s.started) < self.window)
            .map_or(0, |s| s.count)
    }

    /// Drop windows that have fully elapsed
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, s| now.saturating_duration_since(s.started) < self.window);
        before - windows.len()
    }
}

impl Limiter for FixedWindowLimiter {
    fn try_acquire(&self, key: &str) -> Acquire {
        self.try_acquire_limit(key, self.limit)
    }

    fn release(&self, key: &str) {
        if let Some(state) = self.windows.lock().get_mut(key) {
            state.count = state.count.saturating_sub(1);
        }
    }
}
