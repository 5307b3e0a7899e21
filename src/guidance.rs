//! Positioning guidance derived from server `move` messages.
//!
//! A [`GuidanceState`] is the latest `{pitch, roll, circle}` triple; it is
//! replaced wholesale per message. [`translate`] turns it into the hints the
//! overlay draws. Zero, absent and non-finite values never produce a hint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle: Option<f64>,
}

impl GuidanceState {
    /// Read the axes out of a decoded `move` object. Non-numeric fields count as absent.
    pub fn from_move(movement: &serde_json::Map<String, serde_json::Value>) -> Self {
        let axis = |name: &str| movement.get(name).and_then(serde_json::Value::as_f64);
        Self {
            pitch: axis("pitch"),
            roll: axis("roll"),
            circle: axis("circle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchHint {
    pub direction: PitchDirection,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollHint {
    /// The only side that carries a marker
    pub side: RollSide,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationHint {
    pub rotation: Rotation,
    pub magnitude: f64,
}

/// What the overlay should draw for one guidance message
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GuidanceHints {
    pub pitch: Option<PitchHint>,
    pub roll: Option<RollHint>,
    pub circle: Option<RotationHint>,
}

impl GuidanceHints {
    pub fn is_empty(&self) -> bool {
        self.pitch.is_none() && self.roll.is_none() && self.circle.is_none()
    }
}

fn active(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

pub fn translate(state: &GuidanceState) -> GuidanceHints {
    GuidanceHints {
        pitch: active(state.pitch).map(|v| PitchHint {
            direction: if v > 0.0 {
                PitchDirection::Forward
            } else {
                PitchDirection::Backward
            },
            magnitude: v.abs(),
        }),
        roll: active(state.roll).map(|v| RollHint {
            side: if v < 0.0 { RollSide::Left } else { RollSide::Right },
            magnitude: v.abs(),
        }),
        circle: active(state.circle).map(|v| RotationHint {
            rotation: if v > 0.0 {
                Rotation::Clockwise
            } else {
                Rotation::CounterClockwise
            },
            magnitude: v.abs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_nonzero_roll_is_shown() {
        let state = GuidanceState {
            pitch: Some(0.0),
            roll: Some(-5.0),
            circle: Some(0.0),
        };
        let hints = translate(&state);

        assert!(hints.pitch.is_none());
        assert!(hints.circle.is_none());
        let roll = hints.roll.unwrap();
        assert_eq!(roll.side, RollSide::Left);
        assert_eq!(roll.magnitude, 5.0);
    }

    #[test]
    fn signs_pick_directions() {
        let hints = translate(&GuidanceState {
            pitch: Some(-2.5),
            roll: Some(3.0),
            circle: Some(-10.0),
        });
        assert_eq!(hints.pitch.unwrap().direction, PitchDirection::Backward);
        assert_eq!(hints.roll.unwrap().side, RollSide::Right);
        assert_eq!(hints.circle.unwrap().rotation, Rotation::CounterClockwise);

        let hints = translate(&GuidanceState {
            pitch: Some(1.0),
            roll: None,
            circle: Some(15.0),
        });
        assert_eq!(hints.pitch.unwrap().direction, PitchDirection::Forward);
        assert_eq!(hints.circle.unwrap().rotation, Rotation::Clockwise);
    }

    #[test]
    fn absent_zero_and_nan_are_silent() {
        assert!(translate(&GuidanceState::default()).is_empty());
        assert!(translate(&GuidanceState {
            pitch: Some(f64::NAN),
            roll: Some(0.0),
            circle: Some(-0.0),
        })
        .is_empty());
    }

    #[test]
    fn from_move_ignores_non_numeric_fields() {
        let value = json!({"pitch": 4, "roll": "left", "circle": 1.5});
        let state = GuidanceState::from_move(value.as_object().unwrap());
        assert_eq!(state.pitch, Some(4.0));
        assert_eq!(state.roll, None);
        assert_eq!(state.circle, Some(1.5));
    }
}
