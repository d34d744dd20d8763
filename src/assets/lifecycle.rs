//! Asset lifecycle: loads and releases scene resources to match the registry
//!
//! `ModelSet` is shared with the render loop behind a mutex. Loads run as
//! spawned tasks; a load that completes after its instance was removed
//! releases its resource instead of registering it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use glam::Vec3;
use tokio::task::AbortHandle;

use super::catalog::Catalog;
use super::registry::SelectedAssetConfig;
use crate::config::{AssetsConfig, RenderConfig};
use crate::error::AssetError;
use crate::pipeline::control::ControlType;
use crate::scene::{
    default_clip, AnimationClip, AnimationPlayer, LoadedResource, ResourceLoader, SceneNode,
};

/// A registered, renderable asset instance
pub struct LoadedModel {
    pub instance_id: String,
    pub asset_id: String,
    pub url: String,
    pub control_type: ControlType,
    pub node: Box<dyn SceneNode>,
    pub player: Box<dyn AnimationPlayer>,
    pub clips: Vec<AnimationClip>,
}

impl LoadedModel {
    fn release(&mut self) {
        self.player.stop_all();
        self.node.release();
    }
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("instance_id", &self.instance_id)
            .field("asset_id", &self.asset_id)
            .field("control_type", &self.control_type)
            .finish_non_exhaustive()
    }
}

struct LoadTicket {
    generation: u64,
    abort: AbortHandle,
}

/// Loaded instances, in-flight loads and the configuration they answer to
#[derive(Default)]
pub struct ModelSet {
    loaded: HashMap<String, LoadedModel>,
    loading: HashMap<String, LoadTicket>,
    configured: HashMap<String, SelectedAssetConfig>,
    next_generation: u64,
}

impl ModelSet {
    pub fn loaded(&self) -> impl Iterator<Item = &LoadedModel> {
        self.loaded.values()
    }

    pub fn loaded_mut(&mut self) -> impl Iterator<Item = &mut LoadedModel> {
        self.loaded.values_mut()
    }

    pub fn get(&self, instance_id: &str) -> Option<&LoadedModel> {
        self.loaded.get(instance_id)
    }

    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

}

pub type SharedModels = Arc<Mutex<ModelSet>>;

/// What one reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub released: usize,
    pub updated: usize,
    pub started: usize,
}

/// Matches loaded resources to the selected asset configuration
#[derive(Clone)]
pub struct AssetLifecycleManager {
    models: SharedModels,
    loader: Arc<dyn ResourceLoader>,
    catalog: Arc<Catalog>,
    base_offset: Vec3,
    load_timeout: Option<Duration>,
    crossfade: f32,
}

impl AssetLifecycleManager {
    pub fn new(
        loader: Arc<dyn ResourceLoader>,
        catalog: Arc<Catalog>,
        render: &RenderConfig,
        assets: &AssetsConfig,
    ) -> Self {
        let load_timeout = match assets.load_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            models: Arc::new(Mutex::new(ModelSet::default())),
            loader,
            catalog,
            base_offset: Vec3::from_array(render.base_offset),
            load_timeout,
            crossfade: assets.crossfade_secs,
        }
    }

    /// Shared handle for the render loop
    pub fn models(&self) -> SharedModels {
        self.models.clone()
    }

    pub fn loading_count(&self) -> usize {
        self.models.lock().unwrap().loading_count()
    }

    pub fn loaded_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.models.lock().unwrap().loaded.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bring loaded resources in line with `configs`.
    ///
    /// Must be called from within a tokio runtime; loads are spawned and this
    /// returns without waiting for them.
    pub fn reconcile(&self, configs: &[SelectedAssetConfig]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut set = self.models.lock().unwrap();

        set.configured = configs
            .iter()
            .map(|c| (c.instance_id.clone(), c.clone()))
            .collect();

        // 1. Release instances that left the configuration
        let stale: Vec<String> = set
            .loaded
            .keys()
            .filter(|id| !set.configured.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(mut model) = set.loaded.remove(&id) {
                model.release();
                tracing::debug!("Released {} ({})", id, model.asset_id);
                report.released += 1;
            }
        }

        // 2. Update live bindings in place
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for config in configs {
            if !seen.insert(config.instance_id.as_str()) {
                continue;
            }
            if let Some(model) = set.loaded.get_mut(&config.instance_id) {
                model.control_type = config.control_type;
                model.node.set_scale(config.scale);
                report.updated += 1;
            } else if !set.loading.contains_key(&config.instance_id) {
                pending.push(config);
            }
        }

        // 3. Start loads for everything else
        for config in pending {
            let Some(descriptor) = self.catalog.find(&config.asset_id) else {
                tracing::warn!(
                    "Instance {} refers to unknown asset {}",
                    config.instance_id,
                    config.asset_id
                );
                continue;
            };

            set.next_generation += 1;
            let generation = set.next_generation;
            let url = descriptor.url.clone();

            tracing::debug!("Loading {} from {}", config.instance_id, url);
            let load = self.loader.load(&url);
            let handle = tokio::spawn(self.clone().load_instance(
                load,
                config.instance_id.clone(),
                config.asset_id.clone(),
                url,
                generation,
            ));

            set.loading.insert(
                config.instance_id.clone(),
                LoadTicket {
                    generation,
                    abort: handle.abort_handle(),
                },
            );
            report.started += 1;
        }

        report
    }

    async fn load_instance(
        self,
        load: BoxFuture<'static, Result<LoadedResource, AssetError>>,
        instance_id: String,
        asset_id: String,
        url: String,
        generation: u64,
    ) {
        let result = match self.load_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, load).await {
                Ok(result) => result,
                Err(_) => Err(AssetError::Timeout {
                    url: url.clone(),
                    secs: timeout.as_secs(),
                }),
            },
            None => load.await,
        };

        let mut set = self.models.lock().unwrap();

        let current = set
            .loading
            .get(&instance_id)
            .is_some_and(|t| t.generation == generation);
        if current {
            set.loading.remove(&instance_id);
        }

        let resource = match result {
            Ok(resource) => resource,
            Err(e) => {
                tracing::error!("Failed to load asset {} ({}): {}", asset_id, instance_id, e);
                return;
            }
        };

        let config = set.configured.get(&instance_id).cloned();
        match config {
            Some(config) if current && !set.loaded.contains_key(&instance_id) => {
                let model = self.build_model(config, url, resource);
                tracing::info!(
                    "Loaded {} ({}, {} clip(s))",
                    instance_id,
                    asset_id,
                    model.clips.len()
                );
                set.loaded.insert(instance_id, model);
            }
            _ => {
                let LoadedResource { mut node, .. } = resource;
                node.release();
                tracing::debug!("Discarded late load of {}", instance_id);
            }
        }
    }

    fn build_model(
        &self,
        config: SelectedAssetConfig,
        url: String,
        resource: LoadedResource,
    ) -> LoadedModel {
        let LoadedResource { mut node, clips } = resource;
        node.set_position(self.base_offset);
        node.set_scale(config.scale);

        let mut player = self.loader.animation_player(&clips);
        if let Some(clip) = default_clip(&clips) {
            player.play(&clip.name, 0.0);
        }

        LoadedModel {
            instance_id: config.instance_id,
            asset_id: config.asset_id,
            url,
            control_type: config.control_type,
            node,
            player,
            clips,
        }
    }

    /// Crossfade an instance to a named clip (case-insensitive).
    /// Returns false if the instance has no such clip.
    pub fn play_animation(&self, instance_id: &str, clip: &str) -> Result<bool, AssetError> {
        let mut set = self.models.lock().unwrap();
        let model = set
            .loaded
            .get_mut(instance_id)
            .ok_or_else(|| AssetError::UnknownInstance(instance_id.to_string()))?;
        Ok(model.player.play(clip, self.crossfade))
    }

    /// Release every loaded instance and abandon in-flight loads
    pub fn release_all(&self) -> usize {
        let mut set = self.models.lock().unwrap();

        for (id, ticket) in set.loading.drain() {
            ticket.abort.abort();
            tracing::debug!("Abandoned load of {}", id);
        }
        set.configured.clear();

        let count = set.loaded.len();
        for (_, mut model) in set.loaded.drain() {
            model.release();
        }

        if count > 0 {
            tracing::info!("Released {} asset instance(s)", count);
        }
        count
    }
}
