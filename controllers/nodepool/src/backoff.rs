//! # Fibonacci Backoff
//!
//! Requeue delays for NodePools whose reconciliation keeps failing. Delays grow
//! along the Fibonacci sequence in whole minutes: 1m, 1m, 2m, 3m, 5m, 8m,
//! then stay at the cap.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Default first delay in minutes
pub const DEFAULT_MIN_MINUTES: u64 = 1;

/// Default delay cap in minutes
pub const DEFAULT_MAX_MINUTES: u64 = 10;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max_minutes`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_MINUTES, DEFAULT_MAX_MINUTES)
    }
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current delay, advancing the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);

        delay
    }

    /// Restart from the first delay
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Backoff state for a resource
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Per-resource backoff, keyed by `namespace/name`
#[derive(Debug, Default)]
pub struct BackoffTracker {
    states: Mutex<HashMap<String, BackoffState>>,
}

impl BackoffTracker {
    /// Count an error for a resource and return its next delay
    ///
    /// Returns (delay, error_count)
    pub fn record_error(&self, resource_key: &str) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states.entry(resource_key.to_string()).or_default();
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(DEFAULT_MIN_MINUTES * 60), 0)
            }
        }
    }

    /// Forget a resource's errors (on successful reconciliation)
    pub fn reset(&self, resource_key: &str) {
        if let Ok(mut states) = self.states.lock() {
            states.remove(resource_key);
        }
    }
}
