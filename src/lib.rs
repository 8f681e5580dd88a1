//! Core engines for a Raspberry Pi remote-control car.
//!
//! Picar drives two subsystems that share one process:
//!
//! - **Video broadcast**: a single capture loop publishes JPEG frames into a
//!   latest-frame buffer, and any number of viewers stream them as MJPEG at
//!   their own pace
//! - **Motor command**: joystick or dual-lever input is mixed into per-motor
//!   direction and PWM duty, with a watchdog that stops the car when the
//!   controller goes quiet
//!
//! Hardware plugs in through traits ([`FrameSource`], [`FrameEncoder`],
//! [`PinBackend`]). Missing hardware degrades instead of failing: viewers get
//! a placeholder frame and the motors run against [`SimulatedPins`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use picar::{PicarConfig, SyntheticCamera, Vehicle};
//!
//! #[tokio::main]
//! async fn main() -> picar::Result<()> {
//!     let config = PicarConfig::default();
//!     let vehicle =
//!         Vehicle::builder(config).camera(SyntheticCamera::new(640, 480)).start().await?;
//!
//!     vehicle.handle_control_json(r#"{"type": "control", "x": 0.0, "y": 0.6}"#)?;
//!     println!("{:?}", vehicle.status());
//!
//!     vehicle.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod logging;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Engines
pub mod camera;
pub mod drive;
pub mod stream;
mod vehicle;

// Core exports
pub use config::PicarConfig;
pub use error::*;
pub use types::*;

// Engine exports
pub use camera::{FrameEncoder, FrameSource, JpegFrameEncoder, SyntheticCamera};
pub use drive::{ControlOutcome, DriveMixer, Maneuver, PinBackend, SimulatedPins, Watchdog};
pub use stream::{BroadcastBuffer, CaptureLoop, FrameSink, StreamHub, StreamSession};
pub use vehicle::{Vehicle, VehicleBuilder, VehicleStatus};
