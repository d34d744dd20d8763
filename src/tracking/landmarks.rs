//! Landmark frame types produced by the detector helper
//!
//! Coordinates are normalized to the camera image: `x` and `y` lie in
//! `[0, 1]` with the origin at the top-left corner, `z` is relative depth.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Hand landmark indices (21-point hand model)
pub mod hand {
    pub const WRIST: usize = 0;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const PINKY_MCP: usize = 17;

    /// Number of landmarks in a complete hand observation
    pub const COUNT: usize = 21;
}

/// Face mesh landmark indices
pub mod face {
    pub const NOSE_TIP: usize = 1;
    pub const FOREHEAD: usize = 10;
    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
}

/// A single detector-reported point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Component-wise midpoint of two landmarks
    pub fn midpoint(self, other: Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: (self.z + other.z) / 2.0,
        }
    }
}

/// Handedness label as reported by the detector.
///
/// The detector labels hands on the unmirrored camera image, so a hand
/// labelled `Left` appears on the right of the mirrored view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// Which on-screen side a signal belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Handedness {
    /// The on-screen side driven by a hand with this label
    pub fn screen_side(self) -> Side {
        match self {
            Handedness::Left => Side::Right,
            Handedness::Right => Side::Left,
        }
    }
}

/// One detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    #[serde(default)]
    pub score: f32,
}

impl HandObservation {
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

/// One detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub landmarks: Vec<Landmark>,
}

impl FaceObservation {
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.landmarks.get(index).copied()
    }
}

/// Result of one hand-detector callback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandsFrame {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

/// Result of one face-detector callback (at most one face is used)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceFrame {
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

impl FaceFrame {
    pub fn first(&self) -> Option<&FaceObservation> {
        self.faces.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handedness_is_mirrored() {
        assert_eq!(Handedness::Left.screen_side(), Side::Right);
        assert_eq!(Handedness::Right.screen_side(), Side::Left);
    }

    #[test]
    fn test_midpoint() {
        let m = Landmark::new(0.2, 0.4, 0.0).midpoint(Landmark::new(0.4, 0.6, -0.2));
        assert!((m.x - 0.3).abs() < 1e-6);
        assert!((m.y - 0.5).abs() < 1e-6);
        assert!((m.z + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_parse_hands_frame() {
        let json = serde_json::json!({
            "hands": [{
                "handedness": "Left",
                "score": 0.97,
                "landmarks": [{"x": 0.5, "y": 0.5}, {"x": 0.1, "y": 0.2, "z": -0.05}]
            }]
        });
        let frame: HandsFrame = serde_json::from_value(json).unwrap();
        assert_eq!(frame.hands.len(), 1);
        assert_eq!(frame.hands[0].handedness, Handedness::Left);
        assert_eq!(frame.hands[0].get(1), Some(Landmark::new(0.1, 0.2, -0.05)));
        assert_eq!(frame.hands[0].get(hand::INDEX_TIP), None);
    }
}
