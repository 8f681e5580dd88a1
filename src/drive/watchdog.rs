//! Safety watchdog: stops the car when control input goes quiet

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::mixer::DriveMixer;
use crate::Result;
use crate::config::SafetyConfig;

/// Periodic idle check over a [`DriveMixer`].
///
/// The only component that commands the motors without client input. Its
/// stop goes through the mixer, so it refreshes the last-command timestamp
/// like any other command.
#[derive(Debug, Clone)]
pub struct Watchdog {
    mixer: Arc<DriveMixer>,
    timeout: Duration,
    period: Duration,
    enabled: bool,
}

impl Watchdog {
    pub fn new(mixer: Arc<DriveMixer>, safety: &SafetyConfig) -> Self {
        Self {
            mixer,
            timeout: safety.auto_stop_duration(),
            period: safety.check_period(),
            enabled: safety.enable_watchdog,
        }
    }

    /// Run one check. Returns the idle time when the motors were stopped.
    pub fn check(&self) -> Result<Option<Duration>> {
        if !self.enabled {
            return Ok(None);
        }
        let stopped = self.mixer.stop_if_idle(self.timeout)?;
        if let Some(idle) = stopped {
            warn!("Watchdog timeout ({:.1}s) - motors stopped", idle.as_secs_f64());
        }
        Ok(stopped)
    }

    /// Check every period until `cancel` fires. The task returns the number
    /// of stops it issued.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(async move {
            if !self.enabled {
                info!("Watchdog disabled");
                return 0;
            }
            info!(
                timeout_secs = self.timeout.as_secs_f64(),
                period_secs = self.period.as_secs_f64(),
                "Watchdog started"
            );

            let mut ticker = tokio::time::interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stops = 0u64;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Watchdog cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.check() {
                            Ok(Some(_)) => stops += 1,
                            Ok(None) => {}
                            Err(e) => error!("Watchdog failed to stop motors: {}", e),
                        }
                    }
                }
            }

            info!("Watchdog stopped after {} auto-stops", stops);
            stops
        })
    }
}
