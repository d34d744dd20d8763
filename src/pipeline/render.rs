//! The render loop: drain detector mailboxes, smooth, drive assets, draw
//!
//! `FramePipeline` owns all per-session tracking state and is moved into the
//! loop task while it runs. `RenderLoop` holds the only handle to that task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::control::{ControlType, YawSource};
use super::signals::{PipelineState, SignalSet, TrackingStatus};
use super::smoothing::{exp_smooth, smooth_signals, SmoothingProfile};
use crate::assets::lifecycle::SharedModels;
use crate::config::TrackingTuning;
use crate::error::SessionError;
use crate::output::frame::{FrameSink, FrameSnapshot};
use crate::scene::SceneNode;
use crate::tracking::extract::SignalExtractor;
use crate::tracking::mailbox::DetectorReaders;

/// Ease a node toward the signal its control type follows, then set its yaw.
pub fn apply_control(
    node: &mut dyn SceneNode,
    control: ControlType,
    signals: &SignalSet,
    tuning: &TrackingTuning,
) {
    let anchor = control.anchor(signals);
    let target = Vec2::new(anchor.x, anchor.y + tuning.follow_y_offset);

    let mut position = node.position();
    position.x = exp_smooth(position.x, target.x, tuning.follow_alpha);
    position.y = exp_smooth(position.y, target.y, tuning.follow_alpha);
    node.set_position(position);

    if (target.x - position.x).abs() > tuning.turn_threshold {
        let lean = if target.x > position.x {
            tuning.turn_angle
        } else {
            -tuning.turn_angle
        };
        node.set_yaw(exp_smooth(node.yaw(), lean, tuning.turn_alpha));
    }

    match control.yaw_source() {
        YawSource::Travel => {}
        YawSource::HandSpread => {
            let spread = signals.right_pointer.current().x - signals.left_pointer.current().x;
            node.set_yaw(spread * tuning.spread_yaw_factor);
        }
        YawSource::Palm(side) => node.set_yaw(signals.rotation(side).current()),
    }
}

/// Elapsed time between ticks
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    /// Seconds since the previous call; zero on the first call
    pub fn delta(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        dt
    }
}

/// Everything one render tick reads and writes
pub struct FramePipeline {
    pub state: PipelineState,
    extractor: SignalExtractor,
    profile: SmoothingProfile,
    tuning: TrackingTuning,
    readers: DetectorReaders,
    models: SharedModels,
    sink: Arc<dyn FrameSink>,
    status_tx: watch::Sender<TrackingStatus>,
    clock: FrameClock,
    frame: u64,
}

impl FramePipeline {
    pub fn new(
        tuning: &TrackingTuning,
        readers: DetectorReaders,
        models: SharedModels,
        sink: Arc<dyn FrameSink>,
        status_tx: watch::Sender<TrackingStatus>,
    ) -> Self {
        Self {
            state: PipelineState::default(),
            extractor: SignalExtractor::new(tuning),
            profile: SmoothingProfile::from(tuning),
            tuning: tuning.clone(),
            readers,
            models,
            sink,
            status_tx,
            clock: FrameClock::default(),
            frame: 0,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Run one tick with `dt` seconds elapsed
    pub fn tick(&mut self, dt: f32) {
        let mut observed = false;
        if let Some(hands) = self.readers.hands.take_latest() {
            self.extractor.apply_hands(&mut self.state, &hands);
            observed = true;
        }
        if let Some(face) = self.readers.face.take_latest() {
            self.extractor.apply_face(&mut self.state, &face);
        }
        if observed {
            self.publish_status();
        }

        smooth_signals(&mut self.state.signals, &self.profile);

        let models = self.models.clone();
        let mut set = models.lock().unwrap();
        for model in set.loaded_mut() {
            model.player.advance(dt);
            apply_control(
                model.node.as_mut(),
                model.control_type,
                &self.state.signals,
                &self.tuning,
            );
        }

        let status = self.status_tx.borrow().clone();
        let snapshot = FrameSnapshot::capture(self.frame, &status, &self.state, &set);
        drop(set);

        self.sink.draw(&snapshot);
        self.frame += 1;
    }

    /// Tick using the wall-clock delta since the previous tick
    pub fn tick_at(&mut self, now: Instant) {
        let dt = self.clock.delta(now);
        self.tick(dt);
    }

    /// Publish the tracker's status unless the camera is paused; pausing
    /// owns the status until the session resumes.
    fn publish_status(&self) {
        let status = &self.state.status;
        self.status_tx.send_if_modified(|current| {
            if *current != TrackingStatus::CameraPaused && current != status {
                *current = status.clone();
                true
            } else {
                false
            }
        });
    }
}

/// Handle to the running loop task. At most one loop runs per handle.
#[derive(Default)]
pub struct RenderLoop {
    task: Option<JoinHandle<FramePipeline>>,
    cancel: Option<oneshot::Sender<()>>,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start ticking `pipeline` at `fps`
    pub fn start(&mut self, mut pipeline: FramePipeline, fps: u32) -> Result<(), SessionError> {
        if self.task.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    // Fires on cancel or when the handle is dropped
                    _ = &mut cancel_rx => break,

                    instant = interval.tick() => {
                        pipeline.tick_at(instant.into_std());
                    }
                }
            }

            tracing::debug!("Render loop exited after {} frames", pipeline.frame_count());
            pipeline
        });

        tracing::info!("Render loop started at {} fps", fps);
        self.task = Some(task);
        self.cancel = Some(cancel_tx);
        Ok(())
    }

    /// Cancel the loop and wait for it to exit. Returns the pipeline it was driving.
    pub async fn stop(&mut self) -> Option<FramePipeline> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }

        let task = self.task.take()?;
        match task.await {
            Ok(pipeline) => {
                tracing::info!("Render loop stopped");
                Some(pipeline)
            }
            Err(e) => {
                tracing::warn!("Render loop task failed: {}", e);
                None
            }
        }
    }
}
