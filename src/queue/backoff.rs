//! Exponential backoff for queue reconnection attempts.

use std::time::Duration;

use rand::Rng;

const INITIAL_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;
const MULTIPLIER: f64 = 2.0;
const JITTER_FACTOR: f64 = 0.1;

/// Exponential backoff with jitter, reset on a successful connection.
pub struct ReconnectBackoff {
    current_delay_ms: u64,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            current_delay_ms: INITIAL_DELAY_MS,
            attempt: 0,
        }
    }

    /// Delay to wait before the next reconnection attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = (self.current_delay_ms as f64 * MULTIPLIER).min(MAX_DELAY_MS as f64);
        let jitter_range = base * JITTER_FACTOR;
        let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
        let delay = (base + jitter).max(1.0) as u64;

        self.current_delay_ms = delay;
        Duration::from_millis(delay)
    }

    pub fn reset(&mut self) {
        self.current_delay_ms = INITIAL_DELAY_MS;
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}
