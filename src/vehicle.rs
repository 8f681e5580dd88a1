//! Owned vehicle: both engines wired together with an explicit lifecycle

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::camera::{FrameEncoder, FrameSource, JpegFrameEncoder, Orientation};
use crate::config::PicarConfig;
use crate::drive::{
    ControlOutcome, DriveMixer, DriveState, MotorDriver, PinBackend, SimulatedPins, Watchdog,
};
use crate::stream::{
    CaptureHandle, CaptureLoop, CaptureStats, SessionReport, StreamHub, StreamSession,
};
use crate::types::ControlMessage;
use crate::{PicarError, Result};

/// Collaborators for [`Vehicle::start`].
///
/// Anything left unset degrades gracefully: no camera means viewers get the
/// placeholder frame, no pin backend means simulated pins.
pub struct VehicleBuilder {
    config: PicarConfig,
    camera: Option<Box<dyn FrameSource>>,
    encoder: Option<Arc<dyn FrameEncoder>>,
    pins: Option<Box<dyn PinBackend>>,
}

impl VehicleBuilder {
    pub fn new(config: PicarConfig) -> Self {
        Self { config, camera: None, encoder: None, pins: None }
    }

    pub fn camera(mut self, source: impl FrameSource) -> Self {
        self.camera = Some(Box::new(source));
        self
    }

    /// Override the JPEG encoder built from the camera config.
    pub fn encoder(mut self, encoder: Arc<dyn FrameEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn pins(mut self, backend: impl PinBackend) -> Self {
        self.pins = Some(Box::new(backend));
        self
    }

    pub async fn start(self) -> Result<Vehicle> {
        Vehicle::start(self).await
    }
}

/// Health report for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleStatus {
    pub camera_available: bool,
    pub controller_available: bool,
    /// Viewers currently streaming
    pub clients: usize,
    pub frames_published: u64,
    pub latest_version: Option<u64>,
}

/// Running vehicle.
///
/// Owns the stream hub, the capture loop, the drive mixer and the watchdog.
/// [`shutdown`](Vehicle::shutdown) stops all of them and releases the motor
/// pins; dropping the vehicle without it still cancels every task and
/// stops the motors.
pub struct Vehicle {
    config: PicarConfig,
    hub: Arc<StreamHub>,
    capture: Option<CaptureHandle>,
    mixer: Arc<DriveMixer>,
    watchdog: Option<JoinHandle<u64>>,
    controller_available: bool,
    released: bool,
}

impl Vehicle {
    pub fn builder(config: PicarConfig) -> VehicleBuilder {
        VehicleBuilder::new(config)
    }

    async fn start(builder: VehicleBuilder) -> Result<Self> {
        let VehicleBuilder { config, camera, encoder, pins } = builder;
        config.validate()?;

        let hub = Arc::new(StreamHub::new(config.camera.session_poll_interval()));

        let capture = match camera {
            Some(source) => {
                let encoder = encoder.unwrap_or_else(|| {
                    Arc::new(JpegFrameEncoder::new(Orientation::from(&config.camera)))
                });
                match CaptureLoop::start(source, encoder, Arc::clone(&hub), &config.camera).await {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("Camera not available, viewers get the placeholder frame: {}", e);
                        None
                    }
                }
            }
            None => {
                warn!("No camera attached, viewers get the placeholder frame");
                None
            }
        };

        let (driver, controller_available) = Self::motor_driver(&config, pins)?;
        let state = Arc::new(DriveState::new());
        let mixer = Arc::new(
            DriveMixer::new(driver, config.drive.clone(), state)
                .with_command_logging(config.logging.debug_commands),
        );

        let watchdog =
            Watchdog::new(Arc::clone(&mixer), &config.safety)
                .spawn(hub.shutdown_token().child_token());

        info!(
            camera = capture.is_some(),
            controller = controller_available,
            "Vehicle started on {}:{}",
            config.server.host,
            config.server.port
        );

        Ok(Self {
            config,
            hub,
            capture,
            mixer,
            watchdog: Some(watchdog),
            controller_available,
            released: false,
        })
    }

    fn motor_driver(
        config: &PicarConfig,
        pins: Option<Box<dyn PinBackend>>,
    ) -> Result<(MotorDriver, bool)> {
        let simulated = || MotorDriver::new(Box::new(SimulatedPins::new()), &config.motors);
        match pins {
            Some(backend) => match MotorDriver::new(backend, &config.motors) {
                Ok(driver) => Ok((driver, true)),
                Err(e @ PicarError::HardwareUnavailable { .. }) => {
                    warn!("GPIO not available - controller in simulation mode: {}", e);
                    Ok((simulated()?, false))
                }
                Err(e) => Err(e),
            },
            None => {
                warn!("GPIO not available - controller in simulation mode");
                Ok((simulated()?, false))
            }
        }
    }

    pub fn config(&self) -> &PicarConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<StreamHub> {
        &self.hub
    }

    pub fn mixer(&self) -> &Arc<DriveMixer> {
        &self.mixer
    }

    /// Register a viewer; run the returned session against its sink.
    pub fn open_session(&self) -> StreamSession {
        self.hub.open_session()
    }

    /// Register a viewer on its own task and return its multipart byte stream.
    pub fn spawn_stream(
        &self,
    ) -> (impl futures::Stream<Item = Vec<u8>> + Send + 'static, JoinHandle<SessionReport>) {
        self.hub.spawn_stream()
    }

    /// Apply one decoded control message.
    pub fn handle_control(&self, message: &ControlMessage) -> Result<ControlOutcome> {
        self.mixer.handle(message)
    }

    /// Decode and apply a JSON control message.
    ///
    /// Messages longer than `server.max_message_size` are rejected unparsed.
    pub fn handle_control_json(&self, text: &str) -> Result<ControlOutcome> {
        let limit = self.config.server.max_message_size;
        if text.len() > limit {
            warn!("Control message of {} bytes exceeds {} byte limit", text.len(), limit);
            return Err(PicarError::invalid_command(format!(
                "message of {} bytes exceeds the {} byte limit",
                text.len(),
                limit
            )));
        }
        let message = ControlMessage::from_json(text)
            .inspect_err(|e| warn!("Invalid control message: {}", e))?;
        self.handle_control(&message)
    }

    /// The control client went away: stop the motors.
    pub fn control_disconnected(&self) -> Result<()> {
        info!("Control client disconnected, stopping motors");
        self.mixer.stop().map(|_| ())
    }

    pub fn status(&self) -> VehicleStatus {
        let latest_version = self.hub.buffer().read().map(|frame| frame.version);
        VehicleStatus {
            camera_available: self.hub.producer_online(),
            controller_available: self.controller_available,
            clients: self.hub.active_clients(),
            frames_published: latest_version.unwrap_or(0),
            latest_version,
        }
    }

    /// Stop capture, sessions and the watchdog, then release the motors.
    pub async fn shutdown(mut self) -> CaptureStats {
        info!("Shutting down vehicle");
        let stats = match self.capture.take() {
            Some(capture) => capture.stop().await,
            None => CaptureStats::default(),
        };

        self.hub.shutdown();
        if let Some(watchdog) = self.watchdog.take() {
            if let Err(e) = watchdog.await {
                error!("Watchdog task failed: {}", e);
            }
        }

        self.mixer.release();
        self.released = true;
        info!("Vehicle shut down after {} frames", stats.frames_published);
        stats
    }
}

impl Drop for Vehicle {
    fn drop(&mut self) {
        self.hub.shutdown();
        if !self.released {
            self.mixer.release();
        }
    }
}
