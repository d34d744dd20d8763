//! Puppet3D - Headless hand/face tracking service for 3D puppets
//!
//! A tracking-to-3D pipeline that:
//! - Reads hand and face landmarks from a MediaPipe detector helper
//! - Smooths them into pointer, rotation and face signals
//! - Drives user-selected glTF assets from those signals every frame
//! - Publishes frames and status to a browser overlay (HTTP/SSE)

pub mod assets;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scene;
pub mod session;
pub mod tracking;
pub mod web;

pub use config::Config;
pub use error::{Puppet3dError, Result};

use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, RwLock};

use assets::{AssetLifecycleManager, AssetRegistry};
use error::StorageError;
use output::{BroadcastSink, FrameSnapshot};
use pipeline::TrackingStatus;
use scene::ResourceLoader;
use session::{Session, SessionGate};
use tracking::LandmarkSource;

/// Application state shared across all components
pub struct AppState {
    /// Configuration the service started with
    pub config: Config,
    /// User-selected asset instances
    pub registry: RwLock<AssetRegistry>,
    /// Loaded asset instances
    pub lifecycle: AssetLifecycleManager,
    /// The tracking session
    pub session: Mutex<Session>,
    /// Frames drawn by the render loop
    pub frames_tx: broadcast::Sender<FrameSnapshot>,
    /// Current tracking status
    pub status_tx: watch::Sender<TrackingStatus>,
    /// Shutdown signal
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Wire the registry, lifecycle manager and session together
    pub fn new(
        config: Config,
        registry: AssetRegistry,
        loader: Arc<dyn ResourceLoader>,
        source: Box<dyn LandmarkSource>,
        gate: Arc<dyn SessionGate>,
    ) -> Arc<Self> {
        let (frames_tx, _) = broadcast::channel(16);
        let (status_tx, _) = watch::channel(TrackingStatus::Loading);
        let (shutdown_tx, _) = broadcast::channel(1);

        let lifecycle = AssetLifecycleManager::new(
            loader,
            registry.catalog_handle(),
            &config.render,
            &config.assets,
        );

        let session = Session::new(
            &config.tracking,
            &config.render,
            source,
            gate,
            lifecycle.clone(),
            Arc::new(BroadcastSink::new(frames_tx.clone())),
            status_tx.clone(),
        );

        Arc::new(Self {
            config,
            registry: RwLock::new(registry),
            lifecycle,
            session: Mutex::new(session),
            frames_tx,
            status_tx,
            shutdown_tx,
        })
    }

    /// Start a tracking session bound to the registry's selection
    pub async fn start_session(&self) -> Result<()> {
        let assets = self.registry.read().await.subscribe();
        self.session.lock().await.start(assets).await
    }

    /// Stop the running session
    pub async fn stop_session(&self) -> Result<()> {
        self.session.lock().await.stop().await
    }

    /// Apply a registry change on the blocking pool. Every change writes
    /// the settings store, which may touch the filesystem.
    pub async fn edit_registry<T, F>(self: &Arc<Self>, edit: F) -> Result<T>
    where
        F: FnOnce(&mut AssetRegistry) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut registry = state.registry.blocking_write();
            edit(&mut registry)
        })
        .await
        .map_err(|e| StorageError::Write(format!("registry update did not complete: {}", e)).into())
    }

    /// Get the current tracking status
    pub fn status(&self) -> TrackingStatus {
        self.status_tx.borrow().clone()
    }

    /// Subscribe to drawn frames
    pub fn subscribe_frames(&self) -> broadcast::Receiver<FrameSnapshot> {
        self.frames_tx.subscribe()
    }

    /// Subscribe to status changes
    pub fn subscribe_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}


/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
