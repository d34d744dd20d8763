//! Tracking session orchestration
//!
//! Start order: acquire the camera, ask the gate, reconcile assets, start the
//! render loop. A camera failure never consumes a credit.
//!
//! Stop order: render loop, landmark source (camera), loaded assets, detector
//! resources. Every step runs even if an earlier one fails.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::assets::lifecycle::AssetLifecycleManager;
use crate::assets::registry::SelectedAssetConfig;
use crate::config::{RenderConfig, TrackingTuning};
use crate::error::{Puppet3dError, SessionError};
use crate::output::frame::FrameSink;
use crate::pipeline::render::{FramePipeline, RenderLoop};
use crate::pipeline::signals::TrackingStatus;
use crate::tracking::mailbox::detector_mailboxes;
use crate::tracking::LandmarkSource;

/// Decides whether a session may start
pub trait SessionGate: Send + Sync {
    fn authorize(&self) -> Result<(), SessionError>;

    /// Credits left, if this gate counts them
    fn remaining(&self) -> Option<u32> {
        None
    }
}

/// Deducts one credit per session start
#[derive(Debug)]
pub struct CreditGate {
    credits: AtomicU32,
}

impl CreditGate {
    pub fn new(credits: u32) -> Self {
        Self {
            credits: AtomicU32::new(credits),
        }
    }
}

impl SessionGate for CreditGate {
    fn authorize(&self) -> Result<(), SessionError> {
        self.credits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| c.checked_sub(1))
            .map(|before| {
                tracing::info!("Session credit used, {} remaining", before - 1);
            })
            .map_err(|_| SessionError::Denied("no credits remaining".to_string()))
    }

    fn remaining(&self) -> Option<u32> {
        Some(self.credits.load(Ordering::SeqCst))
    }
}

/// Always authorizes (sessions authorized elsewhere)
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl SessionGate for OpenGate {
    fn authorize(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

/// One camera-to-render tracking session
pub struct Session {
    tuning: TrackingTuning,
    target_fps: u32,
    source: Box<dyn LandmarkSource>,
    gate: Arc<dyn SessionGate>,
    lifecycle: AssetLifecycleManager,
    sink: Arc<dyn FrameSink>,
    status_tx: watch::Sender<TrackingStatus>,
    render: RenderLoop,
    watcher: Option<JoinHandle<()>>,
    active: bool,
    paused: bool,
}

impl Session {
    pub fn new(
        tuning: &TrackingTuning,
        render: &RenderConfig,
        source: Box<dyn LandmarkSource>,
        gate: Arc<dyn SessionGate>,
        lifecycle: AssetLifecycleManager,
        sink: Arc<dyn FrameSink>,
        status_tx: watch::Sender<TrackingStatus>,
    ) -> Self {
        Self {
            tuning: tuning.clone(),
            target_fps: render.target_fps,
            source,
            gate,
            lifecycle,
            sink,
            status_tx,
            render: RenderLoop::new(),
            watcher: None,
            active: false,
            paused: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn gate(&self) -> &dyn SessionGate {
        self.gate.as_ref()
    }

    pub fn lifecycle(&self) -> &AssetLifecycleManager {
        &self.lifecycle
    }

    fn set_status(&self, status: TrackingStatus) {
        self.status_tx.send_replace(status);
    }

    /// Start tracking and keep loaded assets in line with `assets`
    pub async fn start(
        &mut self,
        mut assets: watch::Receiver<Vec<SelectedAssetConfig>>,
    ) -> Result<(), Puppet3dError> {
        if self.active {
            return Err(SessionError::AlreadyRunning.into());
        }

        self.set_status(TrackingStatus::StartingCamera);
        let (mailboxes, readers) = detector_mailboxes();

        if let Err(e) = self.source.start(mailboxes).await {
            let status = match &e {
                Puppet3dError::Acquisition(err) => TrackingStatus::CameraError(err.to_string()),
                Puppet3dError::Detector(_) => TrackingStatus::ScriptsFailed,
                other => TrackingStatus::CameraError(other.to_string()),
            };
            tracing::warn!("Session start failed: {}", e);
            self.set_status(status);
            if let Err(close_err) = self.source.close().await {
                tracing::warn!("Failed to close landmark source: {}", close_err);
            }
            return Err(e);
        }

        if let Err(e) = self.gate.authorize() {
            tracing::warn!("Session not authorized: {}", e);
            self.release_source().await;
            self.set_status(TrackingStatus::Stopped);
            return Err(e.into());
        }

        let initial = assets.borrow_and_update().clone();
        self.lifecycle.reconcile(&initial);

        let lifecycle = self.lifecycle.clone();
        self.watcher = Some(tokio::spawn(async move {
            while assets.changed().await.is_ok() {
                let configs = assets.borrow_and_update().clone();
                let report = lifecycle.reconcile(&configs);
                tracing::debug!("Reconciled assets: {:?}", report);
            }
        }));

        let pipeline = FramePipeline::new(
            &self.tuning,
            readers,
            self.lifecycle.models(),
            self.sink.clone(),
            self.status_tx.clone(),
        );
        self.render.start(pipeline, self.target_fps)?;

        self.set_status(TrackingStatus::ShowHands);
        self.active = true;
        self.paused = false;
        tracing::info!("Session started");
        Ok(())
    }

    async fn release_source(&mut self) {
        if let Err(e) = self.source.stop().await {
            tracing::warn!("Failed to stop landmark source: {}", e);
        }
        if let Err(e) = self.source.close().await {
            tracing::warn!("Failed to close landmark source: {}", e);
        }
    }

    /// Tear the session down. All steps run; the first failure is returned.
    pub async fn stop(&mut self) -> Result<(), Puppet3dError> {
        if !self.active {
            return Err(SessionError::NotRunning.into());
        }

        let mut first_err: Option<Puppet3dError> = None;

        // (a) render loop and the reconciliation watcher
        self.render.stop().await;
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            let _ = watcher.await;
        }

        // (b) frame stream
        if let Err(e) = self.source.stop().await {
            tracing::warn!("Failed to stop landmark source: {}", e);
            first_err.get_or_insert(e);
        }

        // (c) loaded assets
        self.lifecycle.release_all();

        // (d) detector resources
        if let Err(e) = self.source.close().await {
            tracing::warn!("Failed to close landmark source: {}", e);
            first_err.get_or_insert(e);
        }

        self.active = false;
        self.paused = false;
        self.set_status(TrackingStatus::Stopped);
        tracing::info!("Session stopped");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn pause_camera(&mut self) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::NotRunning);
        }
        self.source.pause();
        self.paused = true;
        self.set_status(TrackingStatus::CameraPaused);
        Ok(())
    }

    pub fn resume_camera(&mut self) -> Result<(), SessionError> {
        if !self.active {
            return Err(SessionError::NotRunning);
        }
        self.source.resume();
        self.paused = false;
        self.set_status(TrackingStatus::ShowHands);
        Ok(())
    }
}
