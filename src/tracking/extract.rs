//! Signal extraction: landmark frames to control-signal targets
//!
//! The extractor writes only `SignalState::target` values and the status.

use std::f32::consts::PI;

use glam::Vec2;

use super::landmarks::{face, hand, FaceFrame, HandObservation, HandsFrame, Landmark};
use crate::config::TrackingTuning;
use crate::pipeline::signals::{PipelineState, TrackingStatus};

/// Map a normalized image point to pipeline space.
///
/// Mirrors horizontally (selfie view) and centers the origin, so the image
/// center maps to `(0, 0)` for any gain.
pub fn map_to_pipeline(point: Landmark, horizontal_gain: f32, vertical_gain: f32) -> Vec2 {
    let x = (1.0 - point.x) * 2.0 - 1.0;
    let y = (0.5 - point.y) * 2.0;
    Vec2::new(x * horizontal_gain, y * vertical_gain)
}

/// Palm orientation from wrist, index base and pinky base.
///
/// Returns `PI` when the palm normal points toward the camera (positive z),
/// `0` otherwise. Incomplete hands yield `0`.
pub fn palm_rotation(landmarks: &[Landmark]) -> f32 {
    let (Some(wrist), Some(index), Some(pinky)) = (
        landmarks.get(hand::WRIST),
        landmarks.get(hand::INDEX_MCP),
        landmarks.get(hand::PINKY_MCP),
    ) else {
        return 0.0;
    };

    let wrist = wrist.to_vec3();
    let to_index = index.to_vec3() - wrist;
    let to_pinky = pinky.to_vec3() - wrist;
    let normal = to_index.cross(to_pinky);

    if normal.z > 0.0 {
        PI
    } else {
        0.0
    }
}

/// Converts detector output into signal targets
#[derive(Debug, Clone)]
pub struct SignalExtractor {
    tuning: TrackingTuning,
}

impl SignalExtractor {
    pub fn new(tuning: &TrackingTuning) -> Self {
        Self {
            tuning: tuning.clone(),
        }
    }

    fn map(&self, point: Landmark) -> Vec2 {
        map_to_pipeline(point, self.tuning.horizontal_gain, self.tuning.vertical_gain)
    }

    /// Apply one hand-detector result
    pub fn apply_hands(&self, state: &mut PipelineState, frame: &HandsFrame) {
        if frame.hands.is_empty() {
            // Targets hold their last value; only the overlay lists reset
            state.left_landmarks.clear();
            state.right_landmarks.clear();
            state.status = TrackingStatus::ShowHands;
            return;
        }

        for observation in &frame.hands {
            self.apply_hand(state, observation);
        }

        state.status = if frame.hands.len() >= 2 {
            TrackingStatus::BothHandsDetected
        } else {
            TrackingStatus::HandDetected
        };
    }

    fn apply_hand(&self, state: &mut PipelineState, observation: &HandObservation) {
        let Some(tip) = observation.get(hand::INDEX_TIP) else {
            tracing::trace!("Skipping hand with {} landmarks", observation.landmarks.len());
            return;
        };

        let side = observation.handedness.screen_side();
        let rotation = palm_rotation(&observation.landmarks);

        state.signals.pointer_mut(side).target = self.map(tip);
        state.signals.rotation_mut(side).target = rotation;
        *state.landmarks_mut(side) = observation.landmarks.clone();
    }

    /// Apply one face-detector result. A frame without a face changes nothing.
    pub fn apply_face(&self, state: &mut PipelineState, frame: &FaceFrame) {
        let Some(observation) = frame.first() else {
            return;
        };

        if let (Some(upper), Some(lower)) = (
            observation.get(face::UPPER_LIP),
            observation.get(face::LOWER_LIP),
        ) {
            state.signals.mouth.target = self.map(upper.midpoint(lower));
        }

        if let Some(nose) = observation.get(face::NOSE_TIP) {
            state.signals.head.target = self.map(nose) + Vec2::Y * self.tuning.head_offset;
        }

        if let Some(forehead) = observation.get(face::FOREHEAD) {
            state.signals.top_of_head.target =
                self.map(forehead) + Vec2::Y * self.tuning.top_of_head_offset;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::smoothing::{smooth_signals, SmoothingProfile};
    use crate::tracking::landmarks::{FaceObservation, Handedness};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    /// A 21-point hand with the index tip at `(tip_x, tip_y)`.
    /// `toward_camera` picks the wrist/index/pinky winding whose palm normal has positive z.
    pub(crate) fn hand_at(
        handedness: Handedness,
        tip_x: f32,
        tip_y: f32,
        toward_camera: bool,
    ) -> HandObservation {
        let mut landmarks = vec![Landmark::default(); hand::COUNT];
        landmarks[hand::WRIST] = Landmark::new(0.5, 0.8, 0.0);
        let (index_x, pinky_x) = if toward_camera { (0.4, 0.6) } else { (0.6, 0.4) };
        landmarks[hand::INDEX_MCP] = Landmark::new(index_x, 0.6, 0.0);
        landmarks[hand::PINKY_MCP] = Landmark::new(pinky_x, 0.6, 0.0);
        landmarks[hand::INDEX_TIP] = Landmark::new(tip_x, tip_y, 0.0);
        HandObservation {
            landmarks,
            handedness,
            score: 0.9,
        }
    }

    #[test]
    fn test_center_maps_to_origin() {
        for gain in [1.0, 4.0, 5.0, 17.5] {
            let p = map_to_pipeline(Landmark::new(0.5, 0.5, 0.0), gain, gain);
            assert!(approx(p.x, 0.0));
            assert!(approx(p.y, 0.0));
        }
    }

    #[test]
    fn test_mapping_is_mirrored() {
        let p = map_to_pipeline(Landmark::new(0.0, 0.0, 0.0), 5.0, 4.0);
        assert!(approx(p.x, 5.0));
        assert!(approx(p.y, 4.0));

        let p = map_to_pipeline(Landmark::new(1.0, 1.0, 0.0), 5.0, 4.0);
        assert!(approx(p.x, -5.0));
        assert!(approx(p.y, -4.0));
    }

    #[test]
    fn test_palm_rotation_is_binary() {
        let toward = hand_at(Handedness::Left, 0.5, 0.5, true);
        let away = hand_at(Handedness::Left, 0.5, 0.5, false);

        // (-0.1,-0.2,0) x (0.1,-0.2,0) = (0,0,0.04)
        assert_eq!(palm_rotation(&toward.landmarks), PI);
        assert_eq!(palm_rotation(&away.landmarks), 0.0);

        assert_eq!(palm_rotation(&toward.landmarks[..10]), 0.0);
    }

    #[test]
    fn test_handedness_inversion() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let mut state = PipelineState::default();

        // Detector "Left" at the left edge of the raw image
        let frame = HandsFrame {
            hands: vec![hand_at(Handedness::Left, 0.0, 0.5, true)],
        };
        extractor.apply_hands(&mut state, &frame);

        assert!(approx(state.signals.right_pointer.target.x, 5.0));
        assert_eq!(state.signals.left_pointer.target, Vec2::new(-2.0, 0.0));
        assert_eq!(state.right_landmarks.len(), hand::COUNT);
        assert!(state.left_landmarks.is_empty());
        assert_eq!(state.status, TrackingStatus::HandDetected);
    }

    #[test]
    fn test_extractor_never_touches_current() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let mut state = PipelineState::default();
        let before = state.signals.right_pointer.current();

        extractor.apply_hands(
            &mut state,
            &HandsFrame {
                hands: vec![hand_at(Handedness::Left, 0.1, 0.1, true)],
            },
        );

        assert_eq!(state.signals.right_pointer.current(), before);
        assert_eq!(state.signals.right_rotation.current(), 0.0);
        assert_eq!(state.signals.right_rotation.target, PI);
    }

    #[test]
    fn test_both_hands_status() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let mut state = PipelineState::default();
        extractor.apply_hands(
            &mut state,
            &HandsFrame {
                hands: vec![
                    hand_at(Handedness::Left, 0.2, 0.5, true),
                    hand_at(Handedness::Right, 0.8, 0.5, true),
                ],
            },
        );
        assert_eq!(state.status, TrackingStatus::BothHandsDetected);
        assert!(state.signals.right_pointer.target.x > 0.0);
        assert!(state.signals.left_pointer.target.x < 0.0);
    }

    #[test]
    fn test_zero_hands_hold_values() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let profile = SmoothingProfile::default();
        let mut state = PipelineState::default();

        extractor.apply_hands(
            &mut state,
            &HandsFrame {
                hands: vec![hand_at(Handedness::Right, 0.3, 0.3, true)],
            },
        );
        for _ in 0..500 {
            smooth_signals(&mut state.signals, &profile);
        }
        let settled = state.signals.clone();

        for _ in 0..30 {
            extractor.apply_hands(&mut state, &HandsFrame::default());
            smooth_signals(&mut state.signals, &profile);
        }

        assert_eq!(state.signals.left_pointer.current(), settled.left_pointer.current());
        assert_eq!(state.signals.right_pointer.current(), settled.right_pointer.current());
        assert_eq!(state.signals.left_rotation.current(), settled.left_rotation.current());
        assert!(state.left_landmarks.is_empty());
        assert_eq!(state.status, TrackingStatus::ShowHands);
    }

    #[test]
    fn test_face_targets() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let mut state = PipelineState::default();

        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 20];
        landmarks[face::UPPER_LIP] = Landmark::new(0.5, 0.6, 0.0);
        landmarks[face::LOWER_LIP] = Landmark::new(0.5, 0.7, 0.0);
        landmarks[face::FOREHEAD] = Landmark::new(0.5, 0.25, 0.0);

        extractor.apply_face(
            &mut state,
            &FaceFrame {
                faces: vec![FaceObservation { landmarks }],
            },
        );

        // mouth y: (0.5 - 0.65) * 2 * 4
        assert!(approx(state.signals.mouth.target.y, -1.2));
        assert!(approx(state.signals.head.target.y, 1.5));
        // forehead: (0.5 - 0.25) * 2 * 4 + 2
        assert!(approx(state.signals.top_of_head.target.y, 4.0));
        assert_eq!(state.signals.head.current(), Vec2::ZERO);
    }

    #[test]
    fn test_empty_face_frame_is_ignored() {
        let extractor = SignalExtractor::new(&TrackingTuning::default());
        let mut state = PipelineState::default();
        state.signals.mouth.target = Vec2::new(1.0, 1.0);
        extractor.apply_face(&mut state, &FaceFrame::default());
        assert_eq!(state.signals.mouth.target, Vec2::new(1.0, 1.0));
    }
}
