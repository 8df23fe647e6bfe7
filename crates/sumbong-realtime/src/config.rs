//! Realtime channel configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Interval between `ping` frames on an open stream (default: 25 s).
    pub heartbeat_interval: Duration,
    /// Per-connection event buffer. Events beyond it are dropped.
    pub buffer_size: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(25),
            buffer_size: 64,
        }
    }
}
