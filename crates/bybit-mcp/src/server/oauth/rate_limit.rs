//! In-memory sliding-window rate limiter.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Counts events per key over a trailing window.
///
/// Timestamps older than the window are pruned on every check, so memory per
/// key is bounded by `max_events`.
pub struct SlidingWindowLimiter {
    max_events: usize,
    window: Duration,
    events: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Record an event for `key` if the window has room.
    ///
    /// Returns `false` (and records nothing) when `max_events` events already
    /// fall inside the trailing window.
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut events = self.events.lock().await;
        let timestamps = events.entry(key.to_owned()).or_default();

        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_events {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Configured window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlidingWindowLimiter")
            .field("max_events", &self.max_events)
            .field("window", &self.window)
            .finish()
    }
}
