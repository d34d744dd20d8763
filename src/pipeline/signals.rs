//! Per-signal target/current state and the pipeline state bundle

use std::fmt;

use glam::Vec2;
use serde::Serialize;

use super::smoothing::{exp_smooth, Smoothable};
use crate::tracking::landmarks::{Landmark, Side};

/// A control signal: the latest observation (`target`) and the smoothed,
/// render-facing value (`current`).
///
/// Only the smoothing step may move `current`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalState<T> {
    pub target: T,
    current: T,
}

impl<T: Smoothable> SignalState<T> {
    /// Start with both target and current at `initial`
    pub fn new(initial: T) -> Self {
        Self {
            target: initial,
            current: initial,
        }
    }

    pub fn current(&self) -> T {
        self.current
    }

    /// Move `current` one smoothing step toward `target`
    pub fn advance(&mut self, alpha: f32) {
        self.current = exp_smooth(self.current, self.target, alpha);
    }
}

/// Every physical signal the pipeline tracks
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    pub left_pointer: SignalState<Vec2>,
    pub right_pointer: SignalState<Vec2>,
    pub left_rotation: SignalState<f32>,
    pub right_rotation: SignalState<f32>,
    pub mouth: SignalState<Vec2>,
    pub head: SignalState<Vec2>,
    pub top_of_head: SignalState<Vec2>,
}

impl Default for SignalSet {
    fn default() -> Self {
        Self {
            left_pointer: SignalState::new(Vec2::new(-2.0, 0.0)),
            right_pointer: SignalState::new(Vec2::new(2.0, 0.0)),
            left_rotation: SignalState::new(0.0),
            right_rotation: SignalState::new(0.0),
            mouth: SignalState::new(Vec2::ZERO),
            head: SignalState::new(Vec2::ZERO),
            top_of_head: SignalState::new(Vec2::ZERO),
        }
    }
}

impl SignalSet {
    pub fn pointer(&self, side: Side) -> &SignalState<Vec2> {
        match side {
            Side::Left => &self.left_pointer,
            Side::Right => &self.right_pointer,
        }
    }

    pub fn pointer_mut(&mut self, side: Side) -> &mut SignalState<Vec2> {
        match side {
            Side::Left => &mut self.left_pointer,
            Side::Right => &mut self.right_pointer,
        }
    }

    pub fn rotation(&self, side: Side) -> &SignalState<f32> {
        match side {
            Side::Left => &self.left_rotation,
            Side::Right => &self.right_rotation,
        }
    }

    pub fn rotation_mut(&mut self, side: Side) -> &mut SignalState<f32> {
        match side {
            Side::Left => &mut self.left_rotation,
            Side::Right => &mut self.right_rotation,
        }
    }
}

/// Human-readable tracking status shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum TrackingStatus {
    Loading,
    StartingCamera,
    ShowHands,
    HandDetected,
    BothHandsDetected,
    CameraPaused,
    CameraError(String),
    ScriptsFailed,
    Stopped,
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingStatus::Loading => write!(f, "Loading..."),
            TrackingStatus::StartingCamera => write!(f, "Starting camera..."),
            TrackingStatus::ShowHands => write!(f, "Show your hands"),
            TrackingStatus::HandDetected => write!(f, "Hand detected"),
            TrackingStatus::BothHandsDetected => write!(f, "Both hands detected"),
            TrackingStatus::CameraPaused => write!(f, "Camera paused"),
            TrackingStatus::CameraError(msg) => write!(f, "Camera error: {}", msg),
            TrackingStatus::ScriptsFailed => {
                write!(f, "Tracking scripts failed to load. Reload to retry.")
            }
            TrackingStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// All per-session mutable tracking state, owned by the render loop
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub signals: SignalSet,
    pub status: TrackingStatus,
    /// Last landmark list seen for each on-screen hand; cleared when no hands are visible
    pub left_landmarks: Vec<Landmark>,
    pub right_landmarks: Vec<Landmark>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            signals: SignalSet::default(),
            status: TrackingStatus::ShowHands,
            left_landmarks: Vec::new(),
            right_landmarks: Vec::new(),
        }
    }
}

impl PipelineState {
    pub fn landmarks_mut(&mut self, side: Side) -> &mut Vec<Landmark> {
        match side {
            Side::Left => &mut self.left_landmarks,
            Side::Right => &mut self.right_landmarks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_signals() {
        let signals = SignalSet::default();
        assert_eq!(signals.left_pointer.current(), Vec2::new(-2.0, 0.0));
        assert_eq!(signals.right_pointer.current(), Vec2::new(2.0, 0.0));
        assert_eq!(signals.mouth.current(), Vec2::ZERO);
        assert_eq!(signals.left_rotation.current(), 0.0);
    }

    #[test]
    fn test_target_write_leaves_current() {
        let mut state = SignalState::new(Vec2::ZERO);
        state.target = Vec2::new(4.0, -2.0);
        assert_eq!(state.current(), Vec2::ZERO);

        state.advance(0.5);
        assert_eq!(state.current(), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(TrackingStatus::BothHandsDetected.to_string(), "Both hands detected");
        assert_eq!(TrackingStatus::ShowHands.to_string(), "Show your hands");
        assert_eq!(
            TrackingStatus::CameraError("Permission denied".into()).to_string(),
            "Camera error: Permission denied"
        );
    }
}
