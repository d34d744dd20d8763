//! Frame snapshots and the sinks that "draw" them

use serde::Serialize;
use tokio::sync::broadcast;

use crate::assets::lifecycle::ModelSet;
use crate::pipeline::control::ControlType;
use crate::pipeline::signals::{PipelineState, TrackingStatus};
use crate::tracking::landmarks::Landmark;

/// Pose of one asset instance in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPose {
    pub instance_id: String,
    pub asset_id: String,
    pub url: String,
    pub control_type: ControlType,
    pub position: [f32; 3],
    pub yaw: f32,
    pub scale: f32,
    pub clip: Option<String>,
}

/// Smoothed signal values in a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    pub left_pointer: [f32; 2],
    pub right_pointer: [f32; 2],
    pub left_rotation: f32,
    pub right_rotation: f32,
    pub mouth: [f32; 2],
    pub head: [f32; 2],
    pub top_of_head: [f32; 2],
}

/// Everything the overlay needs to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub frame: u64,
    pub status: String,
    pub signals: SignalSnapshot,
    pub left_hand: Vec<Landmark>,
    pub right_hand: Vec<Landmark>,
    pub models: Vec<ModelPose>,
}

impl FrameSnapshot {
    /// `status` is the published session status, which can differ from the
    /// tracker's own view (a paused camera, for one).
    pub fn capture(
        frame: u64,
        status: &TrackingStatus,
        state: &PipelineState,
        models: &ModelSet,
    ) -> Self {
        let s = &state.signals;
        let mut poses: Vec<ModelPose> = models
            .loaded()
            .map(|m| ModelPose {
                instance_id: m.instance_id.clone(),
                asset_id: m.asset_id.clone(),
                url: m.url.clone(),
                control_type: m.control_type,
                position: m.node.position().to_array(),
                yaw: m.node.yaw(),
                scale: m.node.scale(),
                clip: m.player.active_clip().map(str::to_string),
            })
            .collect();
        poses.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));

        Self {
            frame,
            status: status.to_string(),
            signals: SignalSnapshot {
                left_pointer: s.left_pointer.current().to_array(),
                right_pointer: s.right_pointer.current().to_array(),
                left_rotation: s.left_rotation.current(),
                right_rotation: s.right_rotation.current(),
                mouth: s.mouth.current().to_array(),
                head: s.head.current().to_array(),
                top_of_head: s.top_of_head.current().to_array(),
            },
            left_hand: state.left_landmarks.clone(),
            right_hand: state.right_landmarks.clone(),
            models: poses,
        }
    }
}

/// Final stage of every render tick
pub trait FrameSink: Send + Sync {
    fn draw(&self, frame: &FrameSnapshot);
}

/// Publishes frames to subscribers (SSE clients)
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<FrameSnapshot>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<FrameSnapshot>) -> Self {
        Self { tx }
    }
}

impl FrameSink for BroadcastSink {
    fn draw(&self, frame: &FrameSnapshot) {
        // No subscribers is normal
        let _ = self.tx.send(frame.clone());
    }
}

/// Discards frames
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn draw(&self, _frame: &FrameSnapshot) {}
}
