//! Trailing-edge throttle for derived refreshes

use std::time::Duration;

use tokio::time::Instant;

/// Schedules at most one refresh per interval
///
/// The first request arms a deadline `interval` from now. Requests made while
/// a deadline is pending are dropped; the deadline is never pushed back.
#[derive(Debug, Clone)]
pub struct RefreshThrottle {
    interval: Duration,
    deadline: Option<Instant>,
}

impl RefreshThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Request a refresh; returns true if this call armed the timer
    pub fn request(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.interval);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending deadline if it has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending refresh
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
