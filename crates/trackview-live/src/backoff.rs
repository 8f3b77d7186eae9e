//! Reconnect backoff policy

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest exponent applied to the base delay; the cap takes over long before
const MAX_EXPONENT: u32 = 16;

/// Exponential reconnect backoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound for any single delay
    pub max_delay_ms: u64,
    /// Give up after this many consecutive failures; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: None,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// Fixed, jitter-free policy for deterministic tests
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            max_attempts: None,
            jitter: false,
        }
    }

    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(MAX_EXPONENT);
        let ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Delay before retry number `attempt`, including jitter if enabled
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter {
            return delay;
        }
        let ms = delay.as_millis() as u64;
        let extra = rand::rng().random_range(0..=ms / 4);
        Duration::from_millis(ms + extra)
    }

    /// Whether another attempt is allowed after `failures` consecutive failures
    pub fn allows(&self, failures: u32) -> bool {
        self.max_attempts.is_none_or(|max| failures < max)
    }
}
