//! Last-command timestamp shared by the control path and the watchdog

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::{Duration, Instant};

/// Time of the most recent accepted command.
///
/// Stored as microseconds since creation in a single atomic, so a read never
/// observes a half-written value. Updates only move forward: when the
/// command path and the watchdog race, the later timestamp wins.
#[derive(Debug)]
pub struct DriveState {
    origin: Instant,
    last_command_us: AtomicU64,
}

impl DriveState {
    /// Creation counts as the first command, so the watchdog gives a fresh
    /// controller the full timeout before acting.
    pub fn new() -> Self {
        Self { origin: Instant::now(), last_command_us: AtomicU64::new(0) }
    }

    /// Record a command at the current instant.
    pub fn touch(&self) {
        let now = self.origin.elapsed().as_micros().min(u64::MAX as u128) as u64;
        self.last_command_us.fetch_max(now, Ordering::AcqRel);
    }

    pub fn last_command_at(&self) -> Instant {
        self.origin + Duration::from_micros(self.last_command_us.load(Ordering::Acquire))
    }

    /// Time since the last recorded command.
    pub fn since_last_command(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_command_at())
    }
}

impl Default for DriveState {
    fn default() -> Self {
        Self::new()
    }
}
