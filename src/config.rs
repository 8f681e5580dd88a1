//! Static configuration consumed by the engines.
//!
//! Configuration is plain data: the engines never reload it. Every section has
//! defaults matching the reference car build, so a YAML file only needs the
//! values that differ.
//!
//! ```rust
//! use picar::PicarConfig;
//!
//! let config = PicarConfig::from_yaml_str(
//!     r#"
//! camera:
//!   framerate: 15
//! drive:
//!   dead_zone: 0.2
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.camera.framerate, 15);
//! assert_eq!(config.drive.max_speed, 100);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PicarError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PicarConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub motors: MotorsConfig,
    pub drive: DriveConfig,
    pub safety: SafetyConfig,
    pub logging: LoggingConfig,
}

/// Network settings handed to whatever transport hosts the engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest control message accepted, in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_message_size: 1024,
        }
    }
}

/// Camera capture and encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture resolution as (width, height)
    pub resolution: (u32, u32),
    /// Target frames per second; a ceiling, not a floor
    pub framerate: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotation: u16,
    pub hflip: bool,
    pub vflip: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            resolution: (640, 480),
            framerate: 20,
            jpeg_quality: 80,
            rotation: 0,
            hflip: false,
            vflip: false,
        }
    }
}

impl CameraConfig {
    /// Time budget for one capture iteration.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.framerate.max(1) as f64)
    }

    /// How long a stream session waits between buffer checks.
    pub fn session_poll_interval(&self) -> Duration {
        self.frame_interval() / 2
    }
}

/// Pin assignment for one motor channel of the H-bridge (BCM numbering).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorPins {
    pub pin1: u8,
    pub pin2: u8,
    /// PWM enable pin; `None` gives on/off control only
    pub enable: Option<u8>,
    pub inverted: bool,
}

/// Both motor channels plus the shared PWM settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorsConfig {
    /// Motor A, the left side
    pub left: MotorPins,
    /// Motor B, the right side
    pub right: MotorPins,
    pub pwm_frequency: u32,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            left: MotorPins { pin1: 17, pin2: 27, enable: Some(12), inverted: false },
            right: MotorPins { pin1: 23, pin2: 24, enable: Some(13), inverted: false },
            pwm_frequency: 1000,
        }
    }
}

/// Mixing parameters for joystick and dual-lever input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Axis magnitudes below this are treated as zero
    pub dead_zone: f64,
    /// Lowest duty cycle that still moves the car
    pub min_speed: u8,
    pub max_speed: u8,
    /// Duty cycle for preset manoeuvres
    pub default_speed: u8,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self { dead_zone: 0.15, min_speed: 40, max_speed: 100, default_speed: 70 }
    }
}

/// Watchdog settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Seconds without a command before the motors are stopped
    pub auto_stop_timeout: f64,
    pub enable_watchdog: bool,
    /// Seconds between watchdog checks
    pub check_interval: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self { auto_stop_timeout: 2.0, enable_watchdog: true, check_interval: 1.0 }
    }
}

impl SafetyConfig {
    pub fn auto_stop_duration(&self) -> Duration {
        Duration::from_secs_f64(self.auto_stop_timeout)
    }

    pub fn check_period(&self) -> Duration {
        Duration::from_secs_f64(self.check_interval)
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "picar=debug")
    pub level: String,
    /// Log every accepted command at debug level
    pub debug_commands: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), debug_commands: true }
    }
}

impl PicarConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PicarConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| PicarError::parse_error("configuration YAML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let yaml = std::fs::read_to_string(path)
            .map_err(|e| PicarError::config_error(path, e.to_string()))?;
        let config: PicarConfig = serde_yaml_ng::from_str(&yaml)
            .map_err(|e| PicarError::config_error(path, e.to_string()))?;
        config.validate().map_err(|e| PicarError::config_error(path, e.to_string()))?;
        Ok(config)
    }

    /// Check every value the engines rely on.
    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| Err(PicarError::parse_error("configuration", details));

        let drive = &self.drive;
        if !(0.0..1.0).contains(&drive.dead_zone) {
            return invalid(format!("dead_zone {} outside [0, 1)", drive.dead_zone));
        }
        if drive.max_speed > 100 || drive.min_speed > drive.max_speed {
            return invalid(format!(
                "speed range {}..{} must satisfy min <= max <= 100",
                drive.min_speed, drive.max_speed
            ));
        }
        if drive.default_speed > 100 {
            return invalid(format!("default_speed {} above 100", drive.default_speed));
        }

        let camera = &self.camera;
        if camera.framerate == 0 {
            return invalid("framerate must be positive".to_string());
        }
        if !(1..=100).contains(&camera.jpeg_quality) {
            return invalid(format!("jpeg_quality {} outside 1..=100", camera.jpeg_quality));
        }
        if ![0, 90, 180, 270].contains(&camera.rotation) {
            return invalid(format!("rotation {} must be 0, 90, 180 or 270", camera.rotation));
        }
        if camera.resolution.0 == 0 || camera.resolution.1 == 0 {
            return invalid(format!("resolution {:?} has a zero dimension", camera.resolution));
        }

        let safety = &self.safety;
        if !(safety.auto_stop_timeout.is_finite() && safety.auto_stop_timeout > 0.0) {
            return invalid(format!(
                "auto_stop_timeout {} must be positive",
                safety.auto_stop_timeout
            ));
        }
        if !(safety.check_interval.is_finite() && safety.check_interval > 0.0) {
            return invalid(format!("check_interval {} must be positive", safety.check_interval));
        }

        if self.server.max_message_size == 0 {
            return invalid("max_message_size must be positive".to_string());
        }

        if self.motors.pwm_frequency == 0 {
            return invalid("pwm_frequency must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_build() {
        let config = PicarConfig::default();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.camera.framerate, 20);
        assert_eq!(config.motors.left.pin1, 17);
        assert_eq!(config.motors.right.enable, Some(13));
        assert_eq!(config.drive.dead_zone, 0.15);
        assert_eq!(config.safety.auto_stop_timeout, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = PicarConfig::from_yaml_str(
            r#"
motors:
  left: { pin1: 5, pin2: 6, enable: null, inverted: true }
safety:
  enable_watchdog: false
"#,
        )
        .expect("valid config");

        assert_eq!(config.motors.left.enable, None);
        assert!(config.motors.left.inverted);
        assert_eq!(config.motors.right.pin1, 23);
        assert!(!config.safety.enable_watchdog);
        assert_eq!(config.safety.auto_stop_timeout, 2.0);
    }

    #[test]
    fn rejects_inverted_speed_range() {
        let result = PicarConfig::from_yaml_str("drive: { min_speed: 90, max_speed: 50 }");
        assert!(matches!(result, Err(PicarError::Parse { .. })));
    }

    #[test]
    fn rejects_bad_rotation_and_quality() {
        assert!(PicarConfig::from_yaml_str("camera: { rotation: 45 }").is_err());
        assert!(PicarConfig::from_yaml_str("camera: { jpeg_quality: 0 }").is_err());
        assert!(PicarConfig::from_yaml_str("camera: { framerate: 0 }").is_err());
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let result = PicarConfig::load("/nonexistent/picar.yaml");
        match result {
            Err(PicarError::Config { path, .. }) => {
                assert_eq!(path, std::path::PathBuf::from("/nonexistent/picar.yaml"));
            }
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn intervals_follow_framerate() {
        let camera = CameraConfig { framerate: 20, ..CameraConfig::default() };
        assert_eq!(camera.frame_interval(), Duration::from_millis(50));
        assert_eq!(camera.session_poll_interval(), Duration::from_millis(25));
    }
}
