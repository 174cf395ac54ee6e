//! Reconnect throttling (§4.4, §4.8 invariant 8): a failed write only
//! re-attempts `connect()` once `reconnect.interval` has elapsed since the
//! previous attempt; otherwise the packet is dropped silently.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    enabled: bool,
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(enabled: bool, interval_ms: u64) -> Self {
        Self {
            enabled,
            interval: Duration::from_millis(interval_ms),
            last_attempt: None,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether a reconnect attempt should happen now, recording the
    /// attempt if so. The very first call always attempts (nothing to
    /// throttle against yet).
    pub fn should_attempt(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return false;
        }
        match self.last_attempt {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_attempt = Some(now);
                true
            }
        }
    }
}
