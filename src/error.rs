//! Error types for the vehicle engines.
//!
//! Every fallible operation in the crate returns [`PicarError`]. Errors carry
//! structured context and, where a hardware collaborator failed, the boxed
//! source error so the full chain is available for diagnostics.
//!
//! ## Error Categories
//!
//! - **Hardware Errors**: Camera or GPIO absent at startup (non-fatal, degrade)
//! - **Capture Errors**: A single frame failed to capture or encode (skipped)
//! - **Session Errors**: A viewer connection broke (that session ends)
//! - **Command Errors**: Malformed or out-of-range control input (rejected)
//! - **Pin Errors**: A direction or PWM write failed
//! - **Config Errors**: Configuration could not be read or failed validation
//!
//! ## Recovery
//!
//! ```rust
//! use picar::PicarError;
//!
//! let error = PicarError::capture_failed("sensor returned a short buffer");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vehicle operations.
pub type Result<T, E = PicarError> = std::result::Result<T, E>;

/// Boxed collaborator error carried as a source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hardware component named in [`PicarError::HardwareUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hardware {
    Camera,
    Gpio,
}

impl std::fmt::Display for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hardware::Camera => f.write_str("camera"),
            Hardware::Gpio => f.write_str("GPIO"),
        }
    }
}

/// Main error type for vehicle operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PicarError {
    #[error("{hardware} unavailable: {reason}")]
    HardwareUnavailable {
        hardware: Hardware,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Frame capture failed: {reason}")]
    Capture {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("JPEG encoding failed: {reason}")]
    Encode {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Stream session #{client_id} I/O failure")]
    SessionIo {
        client_id: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid control command: {details}")]
    InvalidCommand { details: String },

    #[error("Pin operation failed on GPIO {pin}: {operation}")]
    Pin {
        pin: u8,
        operation: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },
}

impl PicarError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PicarError::HardwareUnavailable { .. } => true,
            PicarError::Capture { .. } => true,
            PicarError::Encode { .. } => true,
            PicarError::SessionIo { .. } => false,
            PicarError::InvalidCommand { .. } => false,
            PicarError::Pin { .. } => true,
            PicarError::Config { .. } => false,
            PicarError::Parse { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PicarError::HardwareUnavailable { hardware: Hardware::Camera, .. } => vec![
                "Check the camera ribbon cable is seated",
                "Enable the camera interface in the firmware config",
                "Make sure no other process holds the camera",
            ],
            PicarError::HardwareUnavailable { hardware: Hardware::Gpio, .. } => vec![
                "Run on a Raspberry Pi with GPIO access",
                "Check the user belongs to the gpio group",
                "The motor engine keeps running in simulation mode",
            ],
            PicarError::Capture { .. } => vec![
                "Check camera power and cabling",
                "Lower the configured frame rate",
                "Restart the capture loop",
            ],
            PicarError::Encode { .. } => vec![
                "Verify the raw image dimensions match the buffer size",
                "Lower the configured JPEG quality",
            ],
            PicarError::SessionIo { .. } => vec![
                "The viewer disconnected or the network dropped",
                "Reconnect the viewer to start a new session",
            ],
            PicarError::InvalidCommand { .. } => vec![
                "Send axis values within [-1.0, 1.0]",
                "Use message type \"control\" or \"dual\"",
            ],
            PicarError::Pin { .. } => vec![
                "Verify the configured BCM pin numbers",
                "Check the motor driver board wiring",
            ],
            PicarError::Config { .. } => vec![
                "Check the configuration file exists and is readable",
                "Compare the values against the documented ranges",
            ],
            PicarError::Parse { .. } => vec![
                "Check the input is well-formed",
                "Verify field names and types",
            ],
        }
    }

    /// Helper constructor for missing hardware.
    pub fn hardware_unavailable(hardware: Hardware, reason: impl Into<String>) -> Self {
        PicarError::HardwareUnavailable { hardware, reason: reason.into(), source: None }
    }

    /// Helper constructor for missing hardware with the driver's error attached.
    pub fn hardware_unavailable_with_source(
        hardware: Hardware,
        reason: impl Into<String>,
        source: BoxError,
    ) -> Self {
        PicarError::HardwareUnavailable { hardware, reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for per-frame capture failures.
    pub fn capture_failed(reason: impl Into<String>) -> Self {
        PicarError::Capture { reason: reason.into(), source: None }
    }

    /// Helper constructor for per-frame capture failures with source.
    pub fn capture_failed_with_source(reason: impl Into<String>, source: BoxError) -> Self {
        PicarError::Capture { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for encoder failures.
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        PicarError::Encode { reason: reason.into(), source: None }
    }

    /// Helper constructor for encoder failures with source.
    pub fn encode_failed_with_source(reason: impl Into<String>, source: BoxError) -> Self {
        PicarError::Encode { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for a broken viewer connection.
    pub fn session_io(client_id: u64, source: std::io::Error) -> Self {
        PicarError::SessionIo { client_id, source }
    }

    /// Helper constructor for rejected control input.
    pub fn invalid_command(details: impl Into<String>) -> Self {
        PicarError::InvalidCommand { details: details.into() }
    }

    /// Helper constructor for failed pin writes.
    pub fn pin_failed(pin: u8, operation: impl Into<String>) -> Self {
        PicarError::Pin { pin, operation: operation.into(), source: None }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        PicarError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        PicarError::Parse { context: context.into(), details: details.into() }
    }
}

impl From<serde_json::Error> for PicarError {
    fn from(err: serde_json::Error) -> Self {
        PicarError::InvalidCommand { details: err.to_string() }
    }
}

impl From<image::ImageError> for PicarError {
    fn from(err: image::ImageError) -> Self {
        PicarError::encode_failed_with_source("image codec error", Box::new(err))
    }
}
