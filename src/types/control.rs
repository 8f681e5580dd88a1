//! Control input accepted at the drive boundary

use serde::Deserialize;

use crate::{PicarError, Result};

/// Decoded control message.
///
/// On the wire this is a JSON object with a `type` field:
///
/// ```json
/// {"type": "control", "x": 0.5, "y": 0.8}
/// {"type": "dual", "left": -1.0, "right": 1.0}
/// ```
///
/// A missing `type` means `"control"` and missing axes mean `0.0`. Any other
/// type decodes to [`ControlMessage::Unsupported`] so the caller can warn and
/// ignore it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Joystick input: `x` turns (negative = left), `y` drives (negative = backward)
    Joystick { x: f64, y: f64 },
    /// Independent left/right lever input
    Dual { left: f64, right: f64 },
    /// Unknown message type
    Unsupported { kind: String },
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    left: f64,
    #[serde(default)]
    right: f64,
}

fn default_kind() -> String {
    "control".to_string()
}

impl From<WireMessage> for ControlMessage {
    fn from(wire: WireMessage) -> Self {
        match wire.kind.as_str() {
            "control" => ControlMessage::Joystick { x: wire.x, y: wire.y },
            "dual" => ControlMessage::Dual { left: wire.left, right: wire.right },
            _ => ControlMessage::Unsupported { kind: wire.kind },
        }
    }
}

impl ControlMessage {
    /// Decode a JSON text message.
    pub fn from_json(text: &str) -> Result<Self> {
        let wire: WireMessage = serde_json::from_str(text)?;
        Ok(wire.into())
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let wire: WireMessage = serde_json::from_value(value)?;
        Ok(wire.into())
    }

    /// Reject axis values that are non-finite or outside [-1, 1].
    pub fn validate(&self) -> Result<()> {
        let (first, second) = match self {
            ControlMessage::Joystick { x, y } => (("x", *x), ("y", *y)),
            ControlMessage::Dual { left, right } => (("left", *left), ("right", *right)),
            ControlMessage::Unsupported { .. } => return Ok(()),
        };

        for (name, value) in [first, second] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(PicarError::invalid_command(format!(
                    "{name}={value} outside [-1.0, 1.0]"
                )));
            }
        }
        Ok(())
    }

    /// Message type label as seen on the wire.
    pub fn kind(&self) -> &str {
        match self {
            ControlMessage::Joystick { .. } => "control",
            ControlMessage::Dual { .. } => "dual",
            ControlMessage::Unsupported { kind } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_joystick_message() {
        let message = ControlMessage::from_json(r#"{"type": "control", "x": 0.5, "y": 0.8}"#)
            .expect("valid message");
        assert_eq!(message, ControlMessage::Joystick { x: 0.5, y: 0.8 });
        assert!(message.validate().is_ok());
    }

    #[test]
    fn missing_type_means_joystick() {
        let message = ControlMessage::from_json(r#"{"y": -0.4}"#).expect("valid message");
        assert_eq!(message, ControlMessage::Joystick { x: 0.0, y: -0.4 });
    }

    #[test]
    fn decodes_dual_message() {
        let value = serde_json::json!({"type": "dual", "left": -1.0, "right": 1.0});
        let message = ControlMessage::from_value(value).expect("valid message");
        assert_eq!(message, ControlMessage::Dual { left: -1.0, right: 1.0 });
        assert_eq!(message.kind(), "dual");
    }

    #[test]
    fn unknown_type_is_unsupported_not_error() {
        let message = ControlMessage::from_json(r#"{"type": "honk"}"#).expect("decodes");
        assert_eq!(message, ControlMessage::Unsupported { kind: "honk".to_string() });
        assert!(message.validate().is_ok());
    }

    #[test]
    fn out_of_range_fails_validation() {
        let message = ControlMessage::from_json(r#"{"type": "control", "x": 1.5, "y": 0}"#)
            .expect("decodes");
        assert!(matches!(message.validate(), Err(PicarError::InvalidCommand { .. })));

        let nan = ControlMessage::Dual { left: f64::NAN, right: 0.0 };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn malformed_json_is_invalid_command() {
        let result = ControlMessage::from_json(r#"{"type": "control", "x": "fast"}"#);
        assert!(matches!(result, Err(PicarError::InvalidCommand { .. })));
    }

    #[test]
    fn numeric_strings_are_not_coerced() {
        for text in [r#"{"type": "control", "x": "0.5"}"#, r#"{"type": "dual", "left": "-1"}"#] {
            let result = ControlMessage::from_json(text);
            assert!(matches!(result, Err(PicarError::InvalidCommand { .. })), "{text}");
        }
    }
}
