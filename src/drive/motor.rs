//! H-bridge motor driver and pin backends

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::config::{MotorPins, MotorsConfig};
use crate::error::Hardware;
use crate::types::{Direction, DriveCommand, Motor, MotorCommand};
use crate::{PicarError, Result};

/// Logic levels on the two direction inputs of one H-bridge channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinPattern {
    pub pin1: bool,
    pub pin2: bool,
}

impl PinPattern {
    pub const FORWARD: PinPattern = PinPattern { pin1: true, pin2: false };
    pub const BACKWARD: PinPattern = PinPattern { pin1: false, pin2: true };
    /// Both inputs low: the channel coasts
    pub const RELEASED: PinPattern = PinPattern { pin1: false, pin2: false };

    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Forward => PinPattern::FORWARD,
            Direction::Backward => PinPattern::BACKWARD,
            Direction::Stop => PinPattern::RELEASED,
        }
    }
}

/// Trait for GPIO access.
///
/// A backend owns the physical pins of both motor channels. Writes are
/// synchronous; the driver serializes all calls behind one lock.
pub trait PinBackend: Send + 'static {
    /// Claim the configured pins and start PWM at 0% duty.
    ///
    /// An error means GPIO is unavailable and the vehicle falls back to
    /// simulated pins.
    fn initialize(&mut self, config: &MotorsConfig) -> Result<()>;

    fn set_direction_pins(&mut self, motor: Motor, pattern: PinPattern) -> Result<()>;

    /// Set the PWM duty cycle (0-100) on the motor's enable pin.
    fn set_duty_cycle(&mut self, motor: Motor, percent: u8) -> Result<()>;

    /// Stop PWM and return every pin to its default state.
    fn release(&mut self) {}

    fn name(&self) -> &str {
        "gpio"
    }
}

/// Two-channel motor driver on top of a [`PinBackend`].
pub struct MotorDriver {
    backend: Box<dyn PinBackend>,
    left: MotorPins,
    right: MotorPins,
    /// Last command written per motor, after inversion
    output: [MotorCommand; 2],
}

impl MotorDriver {
    /// Initialize `backend` and bring both motors to a stop.
    pub fn new(mut backend: Box<dyn PinBackend>, config: &MotorsConfig) -> Result<Self> {
        if let Err(e) = backend.initialize(config) {
            return Err(PicarError::hardware_unavailable_with_source(
                Hardware::Gpio,
                format!("'{}' failed to initialize", backend.name()),
                Box::new(e),
            ));
        }

        let mut driver = Self {
            backend,
            left: config.left,
            right: config.right,
            output: [MotorCommand::STOP; 2],
        };
        driver.apply(DriveCommand::STOP)?;
        info!(
            backend = driver.backend.name(),
            pwm_hz = config.pwm_frequency,
            "Motor driver initialized"
        );
        Ok(driver)
    }

    fn pins(&self, motor: Motor) -> &MotorPins {
        match motor {
            Motor::Left => &self.left,
            Motor::Right => &self.right,
        }
    }

    /// Whether the motor has a PWM channel; without one only on/off works.
    pub fn has_pwm(&self, motor: Motor) -> bool {
        self.pins(motor).enable.is_some()
    }

    /// Drive one motor.
    ///
    /// Sets the direction pins, then the duty cycle when the motor has a PWM
    /// channel (0 for Stop). The motor's inversion flag swaps Forward and
    /// Backward at this level, so callers always speak in car-relative terms.
    pub fn actuate(&mut self, motor: Motor, command: MotorCommand) -> Result<()> {
        let direction = if self.pins(motor).inverted {
            command.direction.reversed()
        } else {
            command.direction
        };

        self.backend.set_direction_pins(motor, PinPattern::for_direction(direction))?;
        if self.has_pwm(motor) {
            let duty = if direction == Direction::Stop { 0 } else { command.duty_cycle };
            self.backend.set_duty_cycle(motor, duty)?;
        }

        self.output[motor as usize] = match direction {
            Direction::Stop => MotorCommand::STOP,
            _ => MotorCommand::new(direction, command.duty_cycle),
        };
        Ok(())
    }

    /// Drive both motors, left first.
    pub fn apply(&mut self, command: DriveCommand) -> Result<()> {
        for motor in Motor::ALL {
            self.actuate(motor, command.get(motor))?;
        }
        Ok(())
    }

    /// What was last written to `motor`, after inversion.
    pub fn output(&self, motor: Motor) -> MotorCommand {
        self.output[motor as usize]
    }

    /// Stop both motors and hand the pins back.
    pub fn release(&mut self) {
        if let Err(e) = self.apply(DriveCommand::STOP) {
            warn!("Failed to stop motors during release: {}", e);
        }
        self.backend.release();
        info!("Motor pins released");
    }
}

impl std::fmt::Debug for MotorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorDriver")
            .field("backend", &self.backend.name())
            .field("output", &self.output)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct SimulatedOutput {
    patterns: [Option<PinPattern>; 2],
    duty: [u8; 2],
    writes: u64,
    initialized: bool,
    released: bool,
    failing: bool,
    config: Option<MotorsConfig>,
}

/// In-memory pin backend used when no GPIO is present.
///
/// Every write is recorded and can be observed through a [`PinProbe`].
#[derive(Debug)]
pub struct SimulatedPins {
    output: Arc<Mutex<SimulatedOutput>>,
    available: bool,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self { output: Arc::default(), available: true }
    }

    /// Backend whose initialization fails, as on a machine without GPIO.
    pub fn unavailable() -> Self {
        Self { available: false, ..Self::new() }
    }

    /// Observer for the recorded pin state.
    pub fn probe(&self) -> PinProbe {
        PinProbe { output: Arc::clone(&self.output) }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedOutput> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_write(&self, output: &SimulatedOutput, motor: Motor, operation: &str) -> Result<()> {
        if output.failing {
            let pin = output
                .config
                .as_ref()
                .map(|c| match motor {
                    Motor::Left => c.left.pin1,
                    Motor::Right => c.right.pin1,
                })
                .unwrap_or_default();
            return Err(PicarError::pin_failed(pin, operation));
        }
        Ok(())
    }
}

impl PinBackend for SimulatedPins {
    fn initialize(&mut self, config: &MotorsConfig) -> Result<()> {
        if !self.available {
            return Err(PicarError::hardware_unavailable(
                Hardware::Gpio,
                "GPIO library not available",
            ));
        }
        let mut output = self.lock();
        output.initialized = true;
        output.released = false;
        output.config = Some(config.clone());
        info!("Simulated pins initialized (no GPIO)");
        Ok(())
    }

    fn set_direction_pins(&mut self, motor: Motor, pattern: PinPattern) -> Result<()> {
        let mut output = self.lock();
        self.check_write(&output, motor, "set direction")?;
        output.patterns[motor as usize] = Some(pattern);
        output.writes += 1;
        Ok(())
    }

    fn set_duty_cycle(&mut self, motor: Motor, percent: u8) -> Result<()> {
        let mut output = self.lock();
        self.check_write(&output, motor, "set duty cycle")?;
        output.duty[motor as usize] = percent.min(100);
        output.writes += 1;
        Ok(())
    }

    fn release(&mut self) {
        let mut output = self.lock();
        output.patterns = [Some(PinPattern::RELEASED); 2];
        output.duty = [0; 2];
        output.released = true;
        debug!("Simulated pins released");
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

impl Default for SimulatedPins {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a [`SimulatedPins`] backend.
#[derive(Debug, Clone)]
pub struct PinProbe {
    output: Arc<Mutex<SimulatedOutput>>,
}

impl PinProbe {
    fn lock(&self) -> MutexGuard<'_, SimulatedOutput> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Direction pattern last written, `None` before the first write.
    pub fn pattern(&self, motor: Motor) -> Option<PinPattern> {
        self.lock().patterns[motor as usize]
    }

    pub fn duty(&self, motor: Motor) -> u8 {
        self.lock().duty[motor as usize]
    }

    /// Total number of pin writes so far.
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Make every following write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }
}
