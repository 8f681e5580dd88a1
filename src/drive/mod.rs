//! Motor command engine.
//!
//! ```text
//! ControlMessage ─▶ DriveMixer ─▶ MotorDriver ─▶ PinBackend (GPIO or simulated)
//!                       ▲  │
//!            Watchdog ──┘  └─▶ DriveState (last command time)
//! ```
//!
//! The mixer turns joystick or dual-lever input into one [`MotorCommand`]
//! per side. Actuation and the last-command timestamp are updated together
//! under the driver lock, which is also where the [`Watchdog`] re-checks
//! idle time before stopping. Whichever of the two writes last wins.
//!
//! [`MotorCommand`]: crate::types::MotorCommand

mod mixer;
mod motor;
mod state;
mod watchdog;

pub use mixer::{ControlOutcome, DriveMixer, Maneuver, dual_command, joystick_command, map_speed};
pub use motor::{MotorDriver, PinBackend, PinPattern, PinProbe, SimulatedPins};
pub use state::DriveState;
pub use watchdog::Watchdog;
