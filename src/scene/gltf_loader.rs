//! glTF/GLB resource loader using the `gltf` crate.
//!
//! Fetches bytes from a file path or an http(s) URL, parses the document and
//! extracts the animation clip list. Buffers are not decoded; the overlay
//! that draws frames fetches the asset itself.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use glam::Vec3;

use super::{AnimationClip, LoadedResource, SceneNode};
use crate::error::AssetError;

/// Scene node backed by a parsed glTF document
pub struct GltfNode {
    position: Vec3,
    yaw: f32,
    scale: f32,
    document: Option<gltf::Document>,
    mesh_count: usize,
    node_count: usize,
}

impl GltfNode {
    fn new(document: gltf::Document) -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            scale: 1.0,
            mesh_count: document.meshes().count(),
            node_count: document.nodes().count(),
            document: Some(document),
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.mesh_count
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_released(&self) -> bool {
        self.document.is_none()
    }
}

impl SceneNode for GltfNode {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn yaw(&self) -> f32 {
        self.yaw
    }

    fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
    }

    fn scale(&self) -> f32 {
        self.scale
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn release(&mut self) {
        if self.document.take().is_some() {
            tracing::debug!(
                "Released glTF node ({} meshes, {} nodes)",
                self.mesh_count,
                self.node_count
            );
        }
    }
}

/// Extract named clips; duration is the latest keyframe over all channels.
pub fn clips_from_document(document: &gltf::Document) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));

            let duration = animation
                .channels()
                .filter_map(|channel| channel.sampler().input().max())
                .filter_map(|max| max.as_array()?.first()?.as_f64())
                .fold(0.0f64, f64::max) as f32;

            AnimationClip::new(name, duration)
        })
        .collect()
}

/// Parse GLB or glTF JSON bytes
pub fn parse(url: &str, bytes: &[u8]) -> Result<LoadedResource, AssetError> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let document = gltf.document;
    let clips = clips_from_document(&document);

    tracing::debug!(
        "Parsed {} ({} meshes, {} clips)",
        url,
        document.meshes().count(),
        clips.len()
    );

    Ok(LoadedResource {
        node: Box::new(GltfNode::new(document)),
        clips,
    })
}

/// Loads assets from local files or over http(s)
#[derive(Debug, Clone)]
pub struct GltfLoader {
    client: reqwest::Client,
    base_dir: PathBuf,
}

impl GltfLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

async fn fetch_http(client: reqwest::Client, url: String) -> Result<Vec<u8>, AssetError> {
    let fetch_err = |message: String| AssetError::Fetch {
        url: url.clone(),
        message,
    };

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;
    Ok(bytes.to_vec())
}

impl super::ResourceLoader for GltfLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<LoadedResource, AssetError>> {
        let url = url.to_string();

        if url.starts_with("http://") || url.starts_with("https://") {
            let client = self.client.clone();
            async move {
                let bytes = fetch_http(client, url.clone()).await?;
                parse(&url, &bytes)
            }
            .boxed()
        } else {
            let path = self.resolve(&url);
            async move {
                let bytes = tokio::fs::read(&path).await.map_err(|e| AssetError::Fetch {
                    url: url.clone(),
                    message: format!("{}: {}", path.display(), e),
                })?;
                parse(&url, &bytes)
            }
            .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ResourceLoader;

    const MINIMAL_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "root"}]
    }"#;

    #[test]
    fn test_parse_minimal_document() {
        let loaded = parse("minimal.gltf", MINIMAL_GLTF.as_bytes()).unwrap();
        assert!(loaded.clips.is_empty());
        assert_eq!(loaded.node.scale(), 1.0);
        assert_eq!(loaded.node.position(), Vec3::ZERO);
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse("broken.glb", b"not a model").unwrap_err();
        assert!(matches!(err, AssetError::Parse { .. }));
    }

    #[test]
    fn test_release_is_idempotent() {
        let gltf = gltf::Gltf::from_slice(MINIMAL_GLTF.as_bytes()).unwrap();
        let mut node = GltfNode::new(gltf.document);
        assert_eq!(node.node_count(), 1);
        assert_eq!(node.mesh_count(), 0);
        node.release();
        node.release();
        assert!(node.is_released());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.gltf"), MINIMAL_GLTF).unwrap();

        let loader = GltfLoader::new(dir.path());
        let loaded = loader.load("model.gltf").await.unwrap();
        assert!(loaded.clips.is_empty());

        let missing = loader.load("missing.glb").await.unwrap_err();
        assert!(matches!(missing, AssetError::Fetch { .. }));
    }
}
