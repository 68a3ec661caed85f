//! Fixed-window request throttle shared by every pipeline worker.
//!
//! Each one-second window admits at most `capacity` calls. The window resets
//! lazily on the first attempt made 1000 ms or more after it opened, so up to
//! `2 * capacity` calls can land close together around a reset. Callers that
//! find the window exhausted sleep a short poll interval outside the lock and
//! try again.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_millis(1000);

/// Sleep between attempts while the window is exhausted.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct WindowState {
    /// 0 means unlimited.
    capacity: u32,
    window_start: Instant,
    used: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<WindowState>,
    poll_interval: Duration,
}

impl RateLimiter {
    /// Limiter admitting `capacity` calls per second (0 = unlimited).
    pub fn new(capacity: u32) -> Self {
        Self {
            state: Mutex::new(WindowState {
                capacity,
                window_start: Instant::now(),
                used: 0,
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set a new capacity and start a fresh window.
    pub fn configure(&self, capacity: u32) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.capacity = capacity;
        state.window_start = Instant::now();
        state.used = 0;
    }

    pub fn capacity(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
    }

    /// One admission attempt; never sleeps.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.capacity == 0 {
            return true;
        }

        let now = Instant::now();
        if now.duration_since(state.window_start) >= WINDOW {
            state.window_start = now;
            state.used = 0;
        }

        if state.used < state.capacity {
            state.used += 1;
            true
        } else {
            false
        }
    }

    /// Block until a permit is granted. Never fails, only delays.
    pub fn acquire(&self) {
        while !self.try_acquire() {
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_never_blocks() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..10_000 {
            assert!(limiter.try_acquire());
        }
    }

    #[test]
    fn exhausts_after_capacity() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn window_resets_after_one_second() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        std::thread::sleep(WINDOW + Duration::from_millis(20));
        assert!(limiter.try_acquire());
    }

    #[test]
    fn configure_resets_usage() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        limiter.configure(2);
        assert_eq!(limiter.capacity(), 2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        limiter.configure(0);
        assert!(limiter.try_acquire());
    }

    #[test]
    fn acquire_waits_for_next_window() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        limiter.acquire();
        limiter.acquire();
        limiter.acquire();
        assert!(start.elapsed() >= Duration::from_millis(990));
    }
}
