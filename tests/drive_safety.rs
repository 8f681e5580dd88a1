//! Motor command engine integration tests
//!
//! Drive a full vehicle on simulated pins: control input through JSON,
//! the watchdog under paused time and configuration-driven wiring.

use std::time::Duration;

use picar::drive::{PinPattern, PinProbe};
use picar::{
    ControlMessage, ControlOutcome, Maneuver, Motor, PicarConfig, PicarError, SimulatedPins,
    Vehicle,
};

async fn vehicle_with(config: PicarConfig) -> (Vehicle, PinProbe) {
    let pins = SimulatedPins::new();
    let probe = pins.probe();
    let vehicle = Vehicle::builder(config).pins(pins).start().await.expect("vehicle starts");
    (vehicle, probe)
}

fn assert_stopped(probe: &PinProbe) {
    for motor in Motor::ALL {
        assert_eq!(probe.pattern(motor), Some(PinPattern::RELEASED), "{motor} still driven");
        assert_eq!(probe.duty(motor), 0, "{motor} duty not zero");
    }
}

#[tokio::test(start_paused = true)]
async fn watchdog_stops_after_silence() {
    let (vehicle, probe) = vehicle_with(PicarConfig::default()).await;

    vehicle.handle_control_json(r#"{"type":"control","x":0.0,"y":0.9}"#).expect("accepted");
    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::FORWARD));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::FORWARD));

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    assert_stopped(&probe);

    vehicle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn steady_input_keeps_the_car_moving() {
    let (vehicle, probe) = vehicle_with(PicarConfig::default()).await;

    // Input every 1.9s never leaves a gap longer than the 2s timeout
    for _ in 0..5 {
        vehicle.handle_control(&ControlMessage::Dual { left: 0.5, right: 0.5 }).expect("accepted");
        tokio::time::sleep(Duration::from_millis(1_900)).await;
        assert_eq!(probe.pattern(Motor::Right), Some(PinPattern::FORWARD));
    }

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_stopped(&probe);
    vehicle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_watchdog_leaves_motors_alone() {
    let config =
        PicarConfig::from_yaml_str("safety:\n  enable_watchdog: false\n").expect("valid config");
    let (vehicle, probe) = vehicle_with(config).await;

    vehicle.mixer().maneuver(Maneuver::Forward, None).expect("accepted");
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::FORWARD));
    assert_eq!(probe.duty(Motor::Left), 70);
    vehicle.shutdown().await;
}

#[tokio::test]
async fn rejected_input_changes_nothing() {
    let (vehicle, probe) = vehicle_with(PicarConfig::default()).await;
    vehicle.handle_control_json(r#"{"type":"dual","left":0.6,"right":-0.6}"#).expect("accepted");
    let writes = probe.writes();
    let stamped = vehicle.mixer().state().last_command_at();

    for bad in [
        r#"{"type":"control","x":1.2,"y":0.0}"#,
        r#"{"type":"dual","left":-3.0}"#,
        r#"{"type":"control","x":"fast"}"#,
        "{",
    ] {
        let err = vehicle.handle_control_json(bad).expect_err("rejected");
        assert!(matches!(err, PicarError::InvalidCommand { .. }), "{bad}: {err}");
    }

    assert_eq!(probe.writes(), writes);
    assert_eq!(vehicle.mixer().state().last_command_at(), stamped);
    vehicle.shutdown().await;
}

#[tokio::test]
async fn dual_extremes_and_ignored_types() {
    let (vehicle, probe) = vehicle_with(PicarConfig::default()).await;

    vehicle.handle_control(&ControlMessage::Dual { left: 1.0, right: 1.0 }).expect("accepted");
    assert_eq!((probe.duty(Motor::Left), probe.duty(Motor::Right)), (100, 100));
    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::FORWARD));

    vehicle.handle_control(&ControlMessage::Dual { left: -1.0, right: -1.0 }).expect("accepted");
    assert_eq!(probe.pattern(Motor::Right), Some(PinPattern::BACKWARD));
    assert_eq!(probe.duty(Motor::Right), 100);

    let writes = probe.writes();
    let outcome = vehicle.handle_control_json(r#"{"type":"ping"}"#).expect("ignored");
    assert_eq!(outcome, ControlOutcome::Ignored { kind: "ping".to_string() });
    assert_eq!(probe.writes(), writes);

    vehicle.shutdown().await;
}

#[tokio::test]
async fn yaml_wiring_controls_pins() {
    let config = PicarConfig::from_yaml_str(
        r#"
motors:
  left: { pin1: 5, pin2: 6, enable: 12, inverted: true }
  right: { pin1: 20, pin2: 21, enable: null, inverted: false }
drive:
  dead_zone: 0.1
  min_speed: 30
  max_speed: 90
"#,
    )
    .expect("valid config");
    let (vehicle, probe) = vehicle_with(config).await;

    vehicle.handle_control_json(r#"{"y": 1.0}"#).expect("accepted");

    // Inverted left side runs its pins backwards; right side has no PWM
    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::BACKWARD));
    assert_eq!(probe.duty(Motor::Left), 90);
    assert_eq!(probe.pattern(Motor::Right), Some(PinPattern::FORWARD));
    assert_eq!(probe.duty(Motor::Right), 0);

    vehicle.control_disconnected().expect("stop");
    assert_stopped(&probe);
    vehicle.shutdown().await;
}

#[tokio::test]
async fn shutdown_releases_pins() {
    let (vehicle, probe) = vehicle_with(PicarConfig::default()).await;
    vehicle.mixer().maneuver(Maneuver::TurnLeft, Some(60)).expect("accepted");
    assert_eq!(probe.pattern(Motor::Left), Some(PinPattern::BACKWARD));

    vehicle.shutdown().await;

    assert!(probe.is_released());
    assert_stopped(&probe);
}
