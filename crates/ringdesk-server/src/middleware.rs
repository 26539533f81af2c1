//! Per-call rate limiting for speech turns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Outcome of one limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitDecision {
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Seconds until the window resets, present only when denied.
    pub retry_after_secs: Option<u64>,
}

/// In-memory fixed-window rate limiter keyed by call identifier.
///
/// Consulted before each speech turn to bound per-call request volume. DTMF
/// and lifecycle events are not limited.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    /// Checks whether one more request for `key` fits in the current window.
    pub fn check_limit(&self, key: &str) -> LimitDecision {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Lock poisoned by a panicked thread. Recover with the stale
                // state; a limiter that refuses everything would take the
                // call flow down with it.
                tracing::error!("rate limiter lock poisoned, recovering with stale state");
                poisoned.into_inner()
            }
        };
        let now = Instant::now();

        // Evict expired windows once the map grows large. Completed calls
        // leave their last window behind otherwise.
        if state.len() > 10_000 {
            let window = self.window;
            state.retain(|_, (_, start)| now.duration_since(*start) <= window);
        }

        let (count, start) = state
            .entry(key.to_string())
            .or_insert((0, now));

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return LimitDecision {
                allowed: true,
                remaining: self.max_requests.saturating_sub(1),
                retry_after_secs: None,
            };
        }

        *count += 1;
        if *count <= self.max_requests {
            LimitDecision {
                allowed: true,
                remaining: self.max_requests - *count,
                retry_after_secs: None,
            }
        } else {
            let elapsed = now.duration_since(*start);
            let retry_after = self.window.saturating_sub(elapsed).as_secs().max(1);
            LimitDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: Some(retry_after),
            }
        }
    }
}
