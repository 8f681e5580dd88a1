//! Joystick and dual-lever mixing into per-motor commands

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::motor::MotorDriver;
use super::state::DriveState;
use crate::config::DriveConfig;
use crate::types::{ControlMessage, Direction, DriveCommand, Motor, MotorCommand};
use crate::{PicarError, Result};

/// Map a normalized speed onto the configured duty range.
///
/// Returns 0 below the dead zone, otherwise
/// `round(min_speed + magnitude * (max_speed - min_speed))`.
pub fn map_speed(value: f64, config: &DriveConfig) -> u8 {
    let magnitude = value.abs().min(1.0);
    if magnitude < config.dead_zone {
        return 0;
    }
    let (min, max) = (f64::from(config.min_speed), f64::from(config.max_speed));
    (min + magnitude * (max - min)).round().clamp(0.0, 100.0) as u8
}

/// Command for one side from a signed speed in [-1, 1].
///
/// A side whose duty maps to 0 is stopped outright, so a motor without PWM
/// never runs at full power for a sub-dead-zone value.
fn side_command(value: f64, config: &DriveConfig) -> MotorCommand {
    let direction = Direction::from_signed(value);
    let duty = map_speed(value, config);
    if direction == Direction::Stop || duty == 0 {
        MotorCommand::STOP
    } else {
        MotorCommand::new(direction, duty)
    }
}

fn require_finite(values: &[(&str, f64)]) -> Result<()> {
    match values.iter().find(|(_, value)| !value.is_finite()) {
        Some((axis, value)) => {
            Err(PicarError::invalid_command(format!("{axis} is not finite ({value})")))
        }
        None => Ok(()),
    }
}

/// Clamp to [-1, 1] and zero anything under the dead zone.
fn condition_axis(value: f64, dead_zone: f64) -> f64 {
    let value = value.clamp(-1.0, 1.0);
    if value.abs() < dead_zone { 0.0 } else { value }
}

/// Differential mix of a joystick position.
///
/// `y` is forward/backward and `x` is the turn: positive `x` slows the left
/// side and speeds up the right side.
pub fn joystick_command(x: f64, y: f64, config: &DriveConfig) -> Result<DriveCommand> {
    require_finite(&[("x", x), ("y", y)])?;
    let x = condition_axis(x, config.dead_zone);
    let y = condition_axis(y, config.dead_zone);
    if x == 0.0 && y == 0.0 {
        return Ok(DriveCommand::STOP);
    }

    let left = (y - x).clamp(-1.0, 1.0);
    let right = (y + x).clamp(-1.0, 1.0);
    Ok(DriveCommand::new(side_command(left, config), side_command(right, config)))
}

/// Independent per-side mix for tank-style input.
pub fn dual_command(left: f64, right: f64, config: &DriveConfig) -> Result<DriveCommand> {
    require_finite(&[("left", left), ("right", right)])?;
    let left = condition_axis(left, config.dead_zone);
    let right = condition_axis(right, config.dead_zone);
    Ok(DriveCommand::new(side_command(left, config), side_command(right, config)))
}

/// Fixed drive patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    Forward,
    Backward,
    /// Spin in place: left backward, right forward
    TurnLeft,
    /// Spin in place: left forward, right backward
    TurnRight,
}

impl Maneuver {
    fn directions(self) -> (Direction, Direction) {
        match self {
            Maneuver::Forward => (Direction::Forward, Direction::Forward),
            Maneuver::Backward => (Direction::Backward, Direction::Backward),
            Maneuver::TurnLeft => (Direction::Backward, Direction::Forward),
            Maneuver::TurnRight => (Direction::Forward, Direction::Backward),
        }
    }
}

/// Result of handing a control message to the mixer.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOutcome {
    /// The message moved (or stopped) the motors
    Applied(DriveCommand),
    /// Unknown message type; nothing changed
    Ignored { kind: String },
}

/// Turns control input into motor actuation.
///
/// Every accepted command, Stop included, refreshes the shared
/// [`DriveState`] after the motors have been written. Rejected input leaves
/// both the motors and the timestamp untouched.
pub struct DriveMixer {
    config: DriveConfig,
    motors: Mutex<MotorDriver>,
    state: Arc<DriveState>,
    log_commands: bool,
}

impl DriveMixer {
    pub fn new(driver: MotorDriver, config: DriveConfig, state: Arc<DriveState>) -> Self {
        Self { config, motors: Mutex::new(driver), state, log_commands: false }
    }

    /// Log every accepted command at debug level.
    pub fn with_command_logging(mut self, enabled: bool) -> Self {
        self.log_commands = enabled;
        self
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<DriveState> {
        &self.state
    }

    fn motors(&self) -> MutexGuard<'_, MotorDriver> {
        self.motors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mix a joystick position and drive the motors.
    pub fn mix_joystick(&self, x: f64, y: f64) -> Result<DriveCommand> {
        let command = joystick_command(x, y, &self.config)
            .inspect_err(|e| warn!("Rejected joystick input: {}", e))?;
        self.execute(command)?;
        if self.log_commands {
            debug!(
                "Joystick: ({:.2}, {:.2}) -> Left: {}, Right: {}",
                x, y, command.left, command.right
            );
        }
        Ok(command)
    }

    /// Drive each side independently.
    pub fn mix_dual(&self, left: f64, right: f64) -> Result<DriveCommand> {
        let command = dual_command(left, right, &self.config)
            .inspect_err(|e| warn!("Rejected dual input: {}", e))?;
        self.execute(command)?;
        if self.log_commands {
            debug!("Dual control -> Left: {}, Right: {}", command.left, command.right);
        }
        Ok(command)
    }

    /// Stop both motors.
    pub fn stop(&self) -> Result<DriveCommand> {
        self.execute(DriveCommand::STOP)?;
        if self.log_commands {
            debug!("Motors stopped");
        }
        Ok(DriveCommand::STOP)
    }

    /// Run a preset manoeuvre at `speed`, or the configured default speed.
    pub fn maneuver(&self, maneuver: Maneuver, speed: Option<u8>) -> Result<DriveCommand> {
        let duty = speed.filter(|s| *s > 0).unwrap_or(self.config.default_speed).min(100);
        let (left, right) = maneuver.directions();
        let command =
            DriveCommand::new(MotorCommand::new(left, duty), MotorCommand::new(right, duty));
        self.execute(command)?;
        if self.log_commands {
            debug!("{:?} at {}%", maneuver, duty);
        }
        Ok(command)
    }

    /// Dispatch a decoded control message.
    ///
    /// Out-of-range or non-finite values are rejected with
    /// [`PicarError::InvalidCommand`]; unknown message types are ignored.
    pub fn handle(&self, message: &ControlMessage) -> Result<ControlOutcome> {
        message.validate().inspect_err(|e| warn!("Rejected control message: {}", e))?;
        match message {
            ControlMessage::Joystick { x, y } => {
                self.mix_joystick(*x, *y).map(ControlOutcome::Applied)
            }
            ControlMessage::Dual { left, right } => {
                self.mix_dual(*left, *right).map(ControlOutcome::Applied)
            }
            ControlMessage::Unsupported { kind } => {
                warn!("Unknown message type: {}", kind);
                Ok(ControlOutcome::Ignored { kind: kind.clone() })
            }
        }
    }

    /// Stop the motors if no command arrived within `timeout`.
    ///
    /// The idle time is measured while holding the motor lock, so a command
    /// that lands first wins and the stop is skipped. Returns the idle time
    /// when a stop was issued.
    pub fn stop_if_idle(&self, timeout: Duration) -> Result<Option<Duration>> {
        let mut motors = self.motors();
        let idle = self.state.since_last_command();
        if idle <= timeout {
            return Ok(None);
        }
        motors.apply(DriveCommand::STOP)?;
        self.state.touch();
        Ok(Some(idle))
    }

    /// Current per-motor output, after inversion.
    pub fn output(&self) -> DriveCommand {
        let motors = self.motors();
        DriveCommand::new(motors.output(Motor::Left), motors.output(Motor::Right))
    }

    /// Stop the motors and release the pins.
    pub fn release(&self) {
        self.motors().release();
        info!("Drive mixer released");
    }

    fn execute(&self, command: DriveCommand) -> Result<()> {
        let mut motors = self.motors();
        motors.apply(command)?;
        self.state.touch();
        Ok(())
    }
}

impl std::fmt::Debug for DriveMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveMixer").field("config", &self.config).finish_non_exhaustive()
    }
}
