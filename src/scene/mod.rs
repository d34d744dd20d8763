//! Capability interfaces over the 3D scene
//!
//! The pipeline only ever talks to these traits. The glTF-backed
//! implementations live in [`gltf_loader`] and [`mixer`]; tests use fakes.

pub mod gltf_loader;
pub mod mixer;

use futures::future::BoxFuture;
use glam::Vec3;
use serde::Serialize;

use crate::error::AssetError;

pub use gltf_loader::GltfLoader;
pub use mixer::ClipMixer;

/// A node attached to the scene graph
pub trait SceneNode: Send {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
    /// Rotation about the vertical axis, radians
    fn yaw(&self) -> f32;
    fn set_yaw(&mut self, yaw: f32);
    fn scale(&self) -> f32;
    fn set_scale(&mut self, scale: f32);
    /// Free the node's resources and detach it. Must be idempotent.
    fn release(&mut self);
}

/// Plays named clips on one node
pub trait AnimationPlayer: Send {
    /// Advance playback by `dt` seconds
    fn advance(&mut self, dt: f32);
    /// Crossfade to `clip` over `fade` seconds. False if no such clip exists.
    fn play(&mut self, clip: &str, fade: f32) -> bool;
    fn active_clip(&self) -> Option<&str>;
    fn stop_all(&mut self);
}

/// A named animation clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// A freshly constructed scene subtree and its clips
pub struct LoadedResource {
    pub node: Box<dyn SceneNode>,
    pub clips: Vec<AnimationClip>,
}

impl std::fmt::Debug for LoadedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedResource")
            .field("clips", &self.clips)
            .finish_non_exhaustive()
    }
}

/// Fetches and constructs 3D resources
pub trait ResourceLoader: Send + Sync {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<LoadedResource, AssetError>>;

    /// Build the player bound to a loaded node
    fn animation_player(&self, clips: &[AnimationClip]) -> Box<dyn AnimationPlayer> {
        Box::new(ClipMixer::new(clips.to_vec()))
    }
}

/// The clip to auto-play: "idle" (any case), else the first clip
pub fn default_clip(clips: &[AnimationClip]) -> Option<&AnimationClip> {
    clips
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case("idle"))
        .or_else(|| clips.first())
}
