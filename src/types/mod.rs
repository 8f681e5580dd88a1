//! Core value types shared by both engines.
//!
//! - [`RawImage`] and [`EncodedFrame`] flow through the video broadcast engine
//! - [`Direction`], [`MotorCommand`] and [`DriveCommand`] flow through the
//!   motor command engine
//! - [`ControlMessage`] is the decoded control input accepted at the boundary

mod control;
mod frame;

pub use control::ControlMessage;
pub use frame::{EncodedFrame, RawImage};

use serde::{Deserialize, Serialize};

/// Rotation sense of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    Stop,
}

impl Direction {
    /// Direction implied by the sign of a normalized speed.
    pub fn from_signed(value: f64) -> Self {
        if value > 0.0 {
            Direction::Forward
        } else if value < 0.0 {
            Direction::Backward
        } else {
            Direction::Stop
        }
    }

    /// Swap Forward and Backward; Stop is unchanged.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Stop => Direction::Stop,
        }
    }
}

/// Which side of the differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Motor {
    /// Motor A
    Left,
    /// Motor B
    Right,
}

impl Motor {
    pub const ALL: [Motor; 2] = [Motor::Left, Motor::Right];
}

impl std::fmt::Display for Motor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Motor::Left => f.write_str("left"),
            Motor::Right => f.write_str("right"),
        }
    }
}

/// Actuation for a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub direction: Direction,
    /// PWM duty cycle percentage, 0-100
    pub duty_cycle: u8,
}

impl MotorCommand {
    pub const STOP: MotorCommand = MotorCommand { direction: Direction::Stop, duty_cycle: 0 };

    pub fn new(direction: Direction, duty_cycle: u8) -> Self {
        Self { direction, duty_cycle: duty_cycle.min(100) }
    }

    pub fn is_stop(&self) -> bool {
        self.direction == Direction::Stop
    }
}

impl std::fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}%", self.direction, self.duty_cycle)
    }
}

/// One command per side, as produced by the drive mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub left: MotorCommand,
    pub right: MotorCommand,
}

impl DriveCommand {
    pub const STOP: DriveCommand =
        DriveCommand { left: MotorCommand::STOP, right: MotorCommand::STOP };

    pub fn new(left: MotorCommand, right: MotorCommand) -> Self {
        Self { left, right }
    }

    pub fn get(&self, motor: Motor) -> MotorCommand {
        match motor {
            Motor::Left => self.left,
            Motor::Right => self.right,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.left.is_stop() && self.right.is_stop()
    }
}
