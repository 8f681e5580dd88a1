//! Capture loop: the single producer feeding the broadcast buffer

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::hub::StreamHub;
use crate::camera::{FrameEncoder, FrameSource};
use crate::config::CameraConfig;
use crate::error::Hardware;
use crate::{PicarError, Result};

/// Counters reported when the capture loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_published: u64,
    pub capture_failures: u64,
    pub encode_failures: u64,
    /// Iterations that took longer than the frame interval
    pub overruns: u64,
}

/// Handle to a running capture loop.
///
/// Stopping the loop ends publishing only; sessions keep serving the last
/// buffered frame until their viewers leave.
pub struct CaptureHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<CaptureStats>>,
}

impl CaptureHandle {
    /// Whether the loop task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the loop and wait for it to release the camera.
    pub async fn stop(mut self) -> CaptureStats {
        self.cancel.cancel();
        match self.task.take() {
            Some(task) => match task.await {
                Ok(stats) => stats,
                Err(e) => {
                    error!("Capture task failed: {}", e);
                    CaptureStats::default()
                }
            },
            None => CaptureStats::default(),
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        // Cancel on drop for clean shutdown
        self.cancel.cancel();
    }
}

/// Marks the hub's producer online for as long as it is held.
///
/// Dropped when the capture task ends, including by panic or abort, so
/// sessions fall back to the placeholder once the camera is gone.
struct ProducerOnline(Arc<StreamHub>);

impl ProducerOnline {
    fn mark(hub: &Arc<StreamHub>) -> Self {
        hub.set_producer_online(true);
        Self(Arc::clone(hub))
    }
}

impl Drop for ProducerOnline {
    fn drop(&mut self) {
        self.0.set_producer_online(false);
    }
}

/// Spawns and runs the capture loop.
pub struct CaptureLoop;

impl CaptureLoop {
    /// Initialize `source` and, if it comes up, spawn the loop.
    ///
    /// Returns [`PicarError::HardwareUnavailable`] when the camera cannot be
    /// initialized; in that case nothing is spawned and the hub stays empty,
    /// so sessions fall back to the placeholder frame.
    pub async fn start<S>(
        mut source: S,
        encoder: Arc<dyn FrameEncoder>,
        hub: Arc<StreamHub>,
        camera: &CameraConfig,
    ) -> Result<CaptureHandle>
    where
        S: FrameSource,
    {
        info!("Initializing camera '{}'...", source.name());
        if let Err(e) = source.initialize().await {
            return Err(PicarError::hardware_unavailable_with_source(
                Hardware::Camera,
                format!("'{}' failed to initialize", source.name()),
                Box::new(e),
            ));
        }

        let interval = camera.frame_interval();
        let quality = camera.jpeg_quality;
        info!(
            width = camera.resolution.0,
            height = camera.resolution.1,
            fps = camera.framerate,
            quality,
            "Camera initialized"
        );

        let cancel = hub.shutdown_token().child_token();
        let online = ProducerOnline::mark(&hub);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let stats =
                Self::capture_task(&mut source, encoder, &hub, interval, quality, task_cancel)
                    .await;
            drop(online);
            source.close().await;
            info!(
                "Frame capture task stopped after {} frames ({} capture failures, {} encode failures)",
                stats.frames_published, stats.capture_failures, stats.encode_failures
            );
            stats
        });

        Ok(CaptureHandle { cancel, task: Some(task) })
    }

    async fn capture_task<S>(
        source: &mut S,
        encoder: Arc<dyn FrameEncoder>,
        hub: &StreamHub,
        interval: Duration,
        quality: u8,
        cancel: CancellationToken,
    ) -> CaptureStats
    where
        S: FrameSource,
    {
        info!("Frame capture task running");
        let mut stats = CaptureStats::default();

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let started = Instant::now();

            let captured = tokio::select! {
                _ = cancel.cancelled() => break,
                result = source.capture() => result,
            };

            match captured {
                Ok(image) => {
                    let encoder = Arc::clone(&encoder);
                    let encoded =
                        tokio::task::spawn_blocking(move || encoder.encode(&image, quality)).await;

                    match encoded {
                        Ok(Ok(jpeg)) if !cancel.is_cancelled() => {
                            let version = hub.buffer().publish(jpeg);
                            stats.frames_published += 1;
                            if stats.frames_published % 100 == 0 {
                                debug!(
                                    "Captured {} frames (version {}), {} clients connected",
                                    stats.frames_published,
                                    version,
                                    hub.active_clients()
                                );
                            }
                        }
                        Ok(Ok(_)) => break,
                        Ok(Err(e)) => {
                            stats.encode_failures += 1;
                            warn!("Error encoding JPEG, frame skipped: {}", e);
                        }
                        Err(e) => {
                            stats.encode_failures += 1;
                            error!("Encoder task failed, frame skipped: {}", e);
                        }
                    }
                }
                Err(e) => {
                    stats.capture_failures += 1;
                    warn!("Frame capture failed, frame skipped: {}", e);
                }
            }

            // Hold the target rate; an overrun starts the next frame at once
            let elapsed = started.elapsed();
            match interval.checked_sub(elapsed) {
                Some(remaining) if !remaining.is_zero() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(remaining) => {}
                    }
                }
                _ => stats.overruns += 1,
            }
        }

        stats
    }
}
